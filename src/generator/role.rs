//! Template roles
//!
//! An entity is rendered with the first role template that matches it, in
//! priority order `enum`, `root`, `owner`, `dependent`, `child`, `record`.
//! Roles without a registered template are never tried.

use std::fmt;

/// Role name = template stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Enum,
    Root,
    Owner,
    Dependent,
    Child,
    Record,
}

/// Graph facts a role decision needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFacts {
    pub is_enum: bool,
    pub is_root: bool,
    pub is_owner: bool,
    pub is_dependent: bool,
}

impl Role {
    /// Priority order
    pub const ALL: [Role; 6] = [
        Role::Enum,
        Role::Root,
        Role::Owner,
        Role::Dependent,
        Role::Child,
        Role::Record,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Enum => "enum",
            Role::Root => "root",
            Role::Owner => "owner",
            Role::Dependent => "dependent",
            Role::Child => "child",
            Role::Record => "record",
        }
    }

    fn matches(&self, facts: &RoleFacts) -> bool {
        if facts.is_enum {
            return *self == Role::Enum;
        }
        match self {
            Role::Enum => false,
            Role::Root => facts.is_root,
            Role::Owner => facts.is_owner,
            Role::Dependent => facts.is_dependent,
            Role::Child => !facts.is_root,
            Role::Record => true,
        }
    }

    /// First role that matches `facts` and has a template
    pub fn classify(facts: &RoleFacts, has_template: impl Fn(Role) -> bool) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| has_template(*role) && role.matches(facts))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
