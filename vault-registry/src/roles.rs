//! Role table and per-operation authorization.
//!
//! A caller is matched against the roles an operation permits, in
//! precedence order (governance, strategist guild, dev-governance,
//! developer). The first role the caller holds is the role the call runs
//! under; dev-governance promotions are clamped on that basis.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::types::Address;

/// Role a call is executed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Governance,
    StrategistGuild,
    DevGovernance,
    Developer,
    Other,
}

impl Role {
    /// Roles in precedence order.
    pub const PRECEDENCE: [Role; 4] = [
        Role::Governance,
        Role::StrategistGuild,
        Role::DevGovernance,
        Role::Developer,
    ];
}

/// Mutating operations subject to a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Promote,
    Demote,
    Purge,
    UpdateMetadata,
    ManageKeys,
    AddVersion,
    AddMetadata,
    SetGovernance,
    SetDev,
    SetDeveloper,
    SetStrategistGuild,
}

impl Operation {
    /// Whether a caller holding `role` may perform this operation.
    pub fn permits(&self, role: Role) -> bool {
        use Role::*;
        match self {
            Self::Promote | Self::Demote => {
                matches!(role, Governance | StrategistGuild | DevGovernance)
            }
            Self::Purge | Self::UpdateMetadata => matches!(role, Governance | StrategistGuild),
            Self::SetDev => matches!(role, Governance | DevGovernance),
            Self::ManageKeys
            | Self::AddVersion
            | Self::AddMetadata
            | Self::SetGovernance
            | Self::SetDeveloper
            | Self::SetStrategistGuild => role == Governance,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Promote => "promote",
            Self::Demote => "demote",
            Self::Purge => "purge",
            Self::UpdateMetadata => "update_metadata",
            Self::ManageKeys => "manage_keys",
            Self::AddVersion => "add_version",
            Self::AddMetadata => "add_metadata",
            Self::SetGovernance => "set_governance",
            Self::SetDev => "set_dev",
            Self::SetDeveloper => "set_developer",
            Self::SetStrategistGuild => "set_strategist_guild",
        }
    }
}

/// Strategist guild membership plus its approval threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategistGuild {
    members: Vec<Address>,
    threshold: usize,
}

impl StrategistGuild {
    /// Validate and build a guild. An empty member list yields an empty
    /// guild with threshold 0.
    pub fn new(members: Vec<Address>, threshold: usize) -> Result<Self> {
        if threshold == 0 {
            return Err(RegistryError::InvalidInput(
                "guild threshold must be positive".to_string(),
            ));
        }
        if members.is_empty() {
            return Ok(Self::default());
        }
        if threshold > members.len() {
            return Err(RegistryError::InvalidInput(format!(
                "guild threshold {threshold} exceeds {} members",
                members.len()
            )));
        }
        if members.iter().any(Address::is_zero) {
            return Err(RegistryError::InvalidInput(
                "zero address in strategist guild".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if !members.iter().all(|m| seen.insert(*m)) {
            return Err(RegistryError::InvalidInput(
                "duplicate strategist guild member".to_string(),
            ));
        }
        Ok(Self { members, threshold })
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    pub fn member(&self, index: usize) -> Result<Address> {
        self.members
            .get(index)
            .copied()
            .ok_or(RegistryError::IndexOutOfBounds {
                index,
                len: self.members.len(),
            })
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Holders of every registry role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    pub(crate) governance: Address,
    pub(crate) dev_governance: Option<Address>,
    pub(crate) developer: Option<Address>,
    pub(crate) strategist_guild: StrategistGuild,
}

impl RoleSet {
    pub fn new(governance: Address, strategist_guild: StrategistGuild) -> Result<Self> {
        if governance.is_zero() {
            return Err(RegistryError::InvalidInput(
                "governance cannot be the zero address".to_string(),
            ));
        }
        Ok(Self {
            governance,
            dev_governance: None,
            developer: None,
            strategist_guild,
        })
    }

    /// Whether `caller` holds `role`.
    pub fn holds(&self, caller: &Address, role: Role) -> bool {
        match role {
            Role::Governance => *caller == self.governance,
            Role::StrategistGuild => self.strategist_guild.contains(caller),
            Role::DevGovernance => self.dev_governance.as_ref() == Some(caller),
            Role::Developer => self.developer.as_ref() == Some(caller),
            Role::Other => true,
        }
    }

    /// Highest-precedence role held by `caller`.
    pub fn classify(&self, caller: &Address) -> Role {
        Role::PRECEDENCE
            .into_iter()
            .find(|role| self.holds(caller, *role))
            .unwrap_or(Role::Other)
    }

    /// Resolve the role `caller` performs `operation` under, or fail.
    pub fn authorize(&self, caller: &Address, operation: Operation) -> Result<Role> {
        Role::PRECEDENCE
            .into_iter()
            .find(|role| operation.permits(*role) && self.holds(caller, *role))
            .ok_or(RegistryError::Unauthorized {
                caller: *caller,
                operation: operation.as_str(),
            })
    }

    pub fn governance(&self) -> Address {
        self.governance
    }

    pub fn dev_governance(&self) -> Option<Address> {
        self.dev_governance
    }

    pub fn developer(&self) -> Option<Address> {
        self.developer
    }

    pub fn strategist_guild(&self) -> &StrategistGuild {
        &self.strategist_guild
    }
}
