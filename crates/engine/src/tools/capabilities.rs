//! Role → operation capability table.
//!
//! Deployments supply the table as TOML:
//!
//! ```toml
//! [roles]
//! narrator = ["deal_damage", "heal", "next_turn"]
//! scribe = ["record_event"]
//! ```
//!
//! A role absent from the file may call nothing. Unknown role or operation names are
//! rejected at load time so a typo never silently widens or narrows a role.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;

use super::operation::{Operation, UnknownOperation};
use super::role::{Role, UnknownRole};

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("Failed to read capability table: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
    #[error("Role {role}: {source}")]
    UnknownOperation {
        role: Role,
        #[source]
        source: UnknownOperation,
    },
}

#[derive(Debug, Deserialize)]
struct CapabilityFile {
    #[serde(default)]
    roles: BTreeMap<String, Vec<String>>,
}

/// Which operations each role may invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    table: HashMap<Role, BTreeSet<Operation>>,
}

impl Capabilities {
    /// Load the table from a TOML file, or fall back to [`Capabilities::builtin`]
    /// when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, CapabilityError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No capability file, using built-in roles");
            return Ok(Self::builtin());
        }
        let file: CapabilityFile = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        let capabilities = Self::from_names(file.roles)?;
        tracing::info!(
            path = %path.display(),
            roles = capabilities.table.len(),
            "Capability table loaded"
        );
        Ok(capabilities)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, CapabilityError> {
        let file: CapabilityFile = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::from_names(file.roles)
    }

    fn from_names(roles: BTreeMap<String, Vec<String>>) -> Result<Self, CapabilityError> {
        let mut table = HashMap::new();
        for (role_name, op_names) in roles {
            let role: Role = role_name.parse()?;
            let ops = op_names
                .iter()
                .map(|name| name.parse::<Operation>())
                .collect::<Result<BTreeSet<_>, _>>()
                .map_err(|source| CapabilityError::UnknownOperation { role, source })?;
            table.insert(role, ops);
        }
        Ok(Self { table })
    }

    /// The default five-role table.
    pub fn builtin() -> Self {
        use Operation::*;

        let reads = Operation::ALL.iter().copied().filter(Operation::is_read_only);
        let dice = [RollDice, CoinFlip, Percentile, RollStats, RandomTable];
        let grant = |extra: &[Operation]| -> BTreeSet<Operation> {
            reads.clone().chain(extra.iter().copied()).collect()
        };
        let grant_with_dice = |extra: &[Operation]| -> BTreeSet<Operation> {
            grant(extra).into_iter().chain(dice).collect()
        };

        let narrator = grant_with_dice(&[
            CreateNpc,
            UpdateNpc,
            SpawnEnemies,
            MoveCharacter,
            ApplyStatuses,
            RemoveStatus,
            DealDamage,
            Heal,
            GiveItem,
            DropItem,
            StartEncounter,
            AddCombatant,
            RemoveCombatant,
            SetInitiative,
            NextTurn,
            EndEncounter,
            AdvanceGameTime,
            RecordEvent,
            CreateQuest,
            BeginQuest,
            UpdateQuest,
            CompleteQuest,
            AbandonQuest,
        ]);
        let world_builder = grant(&[
            SetWorld,
            SetLocation,
            DeleteLocation,
            SetFaction,
            DeleteFaction,
            SetItemBlueprint,
            SetAbilityBlueprint,
            SetLore,
            DeleteLore,
            CreateNpc,
            UpdateNpc,
            DeleteCharacter,
            SpawnItem,
            SetGameTime,
            CreateQuest,
        ]);
        let bookkeeper = grant_with_dice(&[
            CreatePlayerCharacter,
            UpdatePlayerCharacter,
            FinalizeCharacter,
            DeleteCharacter,
            SetLevel,
            SetAttributes,
            SetSkills,
            GrantAbilities,
            RevokeAbility,
            ApplyStatuses,
            RemoveStatus,
            JoinFaction,
            LeaveFaction,
            SetFactionStanding,
            DealDamage,
            Heal,
            SpawnItem,
            DestroyItem,
            GiveItem,
            DropItem,
            SetItemQuantity,
            SetItemAttribute,
            ApplyItemStatus,
            RemoveItemStatus,
            FormParty,
            DisbandParty,
            RenameParty,
            AddToParty,
            RemoveFromParty,
            SetPartyLeader,
        ]);
        let historian = grant(&[RecordEvent, DeleteEvent, SetChronicle, DeleteChronicle, SetLore]);
        let scribe = grant(&[RecordEvent, UpdateQuest]);

        Self {
            table: HashMap::from([
                (Role::Narrator, narrator),
                (Role::WorldBuilder, world_builder),
                (Role::Bookkeeper, bookkeeper),
                (Role::Historian, historian),
                (Role::Scribe, scribe),
            ]),
        }
    }

    pub fn allows(&self, role: Role, op: Operation) -> bool {
        self.table.get(&role).is_some_and(|ops| ops.contains(&op))
    }

    /// The capability set of `role`, in declaration order.
    pub fn operations(&self, role: Role) -> Vec<Operation> {
        self.table
            .get(&role)
            .map(|ops| ops.iter().copied().collect())
            .unwrap_or_default()
    }
}
