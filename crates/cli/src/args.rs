//! CLI argument definitions using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use buildledger_core::WorkOrderId;
use buildledger_inventory::{InventoryState, SkuType};

#[derive(Parser, Debug)]
#[command(name = "buildledger")]
#[command(version, about = "BOM-driven manufacturing inventory ledger")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Ledger snapshot file (default: $BUILDLEDGER_SNAPSHOT)
    #[arg(long, short = 's', global = true)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// How many units can be built from current stock (one SKU or all)
    Eligibility {
        sku_code: Option<String>,
    },

    /// Raw-material totals for building QTY units
    Requirements {
        sku_code: String,
        quantity: i64,
    },

    /// Lots of a SKU across all states
    Lots {
        sku_code: String,
    },

    /// List work orders
    WorkOrders,

    /// Add a SKU to the catalog
    RegisterSku {
        code: String,
        #[arg(value_enum)]
        sku_type: SkuKind,
    },

    /// Set (or replace) a BOM line
    SetBom {
        parent: String,
        component: String,
        quantity_per_unit: i64,
    },

    /// Record goods arriving (RECEIVED, not yet usable)
    Receive {
        sku_code: String,
        quantity: i64,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Release received stock into usable inventory
    SignOff {
        sku_code: String,
        quantity: i64,
        #[arg(long)]
        location: Option<String>,
    },

    /// Ship usable stock out
    Transfer {
        sku_code: String,
        quantity: i64,
        #[arg(long)]
        location: Option<String>,
    },

    /// Manually change the quantity held in one state
    Adjust {
        sku_code: String,
        state: InventoryState,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
        #[arg(long)]
        location: Option<String>,
    },

    /// Open a work order
    CreateWorkOrder {
        sku_code: String,
        quantity: i64,
    },

    /// Cancel an open work order
    CancelWorkOrder {
        work_order_id: WorkOrderId,
    },

    /// Build against a work order
    Build {
        work_order_id: WorkOrderId,
        quantity: i64,
    },
}

impl Command {
    /// Whether the command changes the ledger (and so rewrites the snapshot).
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::Eligibility { .. }
                | Command::Requirements { .. }
                | Command::Lots { .. }
                | Command::WorkOrders
        )
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkuKind {
    Raw,
    Assembly,
    Completed,
}

impl From<SkuKind> for SkuType {
    fn from(kind: SkuKind) -> Self {
        match kind {
            SkuKind::Raw => SkuType::Raw,
            SkuKind::Assembly => SkuType::Assembly,
            SkuKind::Completed => SkuType::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_with_snapshot() {
        let id = WorkOrderId::new();
        let cli = Cli::try_parse_from([
            "buildledger",
            "--snapshot",
            "ledger.json",
            "build",
            &id.to_string(),
            "3",
        ])
        .unwrap();
        assert_eq!(cli.snapshot, Some(PathBuf::from("ledger.json")));
        match cli.command {
            Command::Build {
                work_order_id,
                quantity,
            } => {
                assert_eq!(work_order_id, id);
                assert_eq!(quantity, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_states_case_insensitively_and_negative_deltas() {
        let cli =
            Cli::try_parse_from(["buildledger", "adjust", "WIDGET", "assembled", "-2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Adjust {
                state: InventoryState::Assembled,
                delta: -2,
                ..
            }
        ));
        assert!(cli.command.is_mutating());
    }

    #[test]
    fn rejects_malformed_work_order_ids() {
        assert!(Cli::try_parse_from(["buildledger", "build", "nope", "1"]).is_err());
    }
}
