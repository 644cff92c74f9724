//! Parser for hierarchical resource ids.
//!
//! Accepted shapes:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}/{subtype}/{subname}
//! ```
//!
//! Anything else parses to [`ParsedResourceId::Unparsed`]; callers skip
//! those. Captured values are returned exactly as they appear in the path.

use std::fmt;

/// Nested child resource (`/{subtype}/{subname}` suffix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResource {
    pub resource_type: String,
    pub name: String,
}

/// Structured form of a resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentifier {
    pub subscription: String,
    pub resource_group: String,
    pub provider: String,
    pub resource_type: String,
    pub name: String,
    pub child: Option<ChildResource>,
}

/// Outcome of [`ResourceIdentifier::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResourceId {
    Parsed(ResourceIdentifier),
    /// The path does not have the expected hierarchical shape.
    Unparsed,
}

impl ResourceIdentifier {
    pub fn parse(path: &str) -> ParsedResourceId {
        let Some(rest) = path.strip_prefix('/') else {
            return ParsedResourceId::Unparsed;
        };
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return ParsedResourceId::Unparsed;
        }

        match segments.as_slice() {
            [subs, sub, groups, rg, providers, ns, ty, name, tail @ ..]
                if keyword(subs, "subscriptions")
                    && keyword(groups, "resourceGroups")
                    && keyword(providers, "providers") =>
            {
                let child = match tail {
                    [] => None,
                    [sub_type, sub_name] => Some(ChildResource {
                        resource_type: (*sub_type).to_string(),
                        name: (*sub_name).to_string(),
                    }),
                    _ => return ParsedResourceId::Unparsed,
                };
                ParsedResourceId::Parsed(ResourceIdentifier {
                    subscription: (*sub).to_string(),
                    resource_group: (*rg).to_string(),
                    provider: (*ns).to_string(),
                    resource_type: (*ty).to_string(),
                    name: (*name).to_string(),
                    child,
                })
            }
            _ => ParsedResourceId::Unparsed,
        }
    }

    /// Child resource type, or `""` for a top-level resource.
    pub fn sub_type(&self) -> &str {
        self.child
            .as_ref()
            .map_or("", |child| child.resource_type.as_str())
    }

    /// Child resource name, or `""` for a top-level resource.
    pub fn sub_name(&self) -> &str {
        self.child.as_ref().map_or("", |child| child.name.as_str())
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription, self.resource_group, self.provider, self.resource_type, self.name
        )?;
        if let Some(child) = &self.child {
            write!(f, "/{}/{}", child.resource_type, child.name)?;
        }
        Ok(())
    }
}

// The platform emits both `resourceGroups` and `resourcegroups`.
fn keyword(segment: &str, expected: &str) -> bool {
    segment.eq_ignore_ascii_case(expected)
}
