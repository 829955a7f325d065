use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Quantity, tables};

/// Group label shown above the credit columns in search result pickers.
pub const SEARCH_GROUP_LABEL: &str = "Credit vouchers";

/// Item types that expose credit columns in their search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Ticket,
    Entity,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Ticket => "ticket",
            ItemType::Entity => "entity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ticket" => Some(ItemType::Ticket),
            "entity" => Some(ItemType::Entity),
            _ => None,
        }
    }

    /// Table holding the items themselves; every join path starts here.
    pub fn root_table(&self) -> &'static str {
        match self {
            ItemType::Ticket => tables::TICKETS,
            ItemType::Entity => tables::ENTITIES,
        }
    }

    pub fn search_options(&self) -> &'static [SearchOption] {
        match self {
            ItemType::Ticket => &TICKET_OPTIONS,
            ItemType::Entity => &ENTITY_OPTIONS,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataType {
    Date,
    /// Bounds and step are quantities in hundredths. `zero_label` is shown
    /// instead of 0 in input widgets.
    Decimal {
        min: Quantity,
        max: Quantity,
        step: Quantity,
        zero_label: Option<&'static str>,
    },
    Dropdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    /// The joined table carries `link_field` pointing at the previous table's id.
    Child,
    /// The previous table carries `link_field` pointing at the joined table's id.
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinParams {
    pub link_field: &'static str,
    pub join_type: JoinType,
    /// Table that must be joined before this one
    pub before_join: Option<&'static BeforeJoin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BeforeJoin {
    pub table: &'static str,
    pub join: JoinParams,
}

/// One virtual column added to an item type's search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchOption {
    pub id: u32,
    pub table: &'static str,
    pub field: &'static str,
    pub name: &'static str,
    pub datatype: DataType,
    pub join: JoinParams,
}

/// A single resolved join, in the order it must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinStep {
    pub table: &'static str,
    pub link_field: &'static str,
    pub join_type: JoinType,
}

impl SearchOption {
    /// Joins needed to reach this column from the item's root table.
    pub fn join_path(&self) -> Vec<JoinStep> {
        let mut steps = Vec::new();
        push_steps(self.table, &self.join, &mut steps);
        steps
    }

    pub fn column_alias(&self) -> String {
        format!("col_{}", self.id)
    }
}

fn push_steps(table: &'static str, join: &JoinParams, steps: &mut Vec<JoinStep>) {
    if let Some(before) = join.before_join {
        push_steps(before.table, &before.join, steps);
    }
    steps.push(JoinStep {
        table,
        link_field: join.link_field,
        join_type: join.join_type,
    });
}

/// Value of one search column, decoded according to its `DataType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchValue {
    Date(DateTime<Utc>),
    Decimal(Quantity),
    Text(String),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchCell {
    pub option_id: u32,
    pub value: SearchValue,
}

/// One result line; cells follow the order of the item type's options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRow {
    pub cells: Vec<SearchCell>,
}

impl SearchRow {
    pub fn get(&self, option_id: u32) -> Option<&SearchValue> {
        self.cells
            .iter()
            .find(|cell| cell.option_id == option_id)
            .map(|cell| &cell.value)
    }
}

pub const OPTION_DATE_CONSUMED: u32 = 881;
pub const OPTION_CONSUMED: u32 = 882;
pub const OPTION_VOUCHER_NAME: u32 = 883;

const CONSUMED_DATATYPE: DataType = DataType::Decimal {
    min: 100,
    max: 1_000_000,
    step: 25,
    zero_label: Some("Unlimited"),
};

const TICKET_TO_CONSUMPTION: JoinParams = JoinParams {
    link_field: "ticket_id",
    join_type: JoinType::Child,
    before_join: None,
};

const TICKET_CONSUMPTION_JOIN: BeforeJoin = BeforeJoin {
    table: tables::CONSUMPTIONS,
    join: TICKET_TO_CONSUMPTION,
};

static TICKET_OPTIONS: [SearchOption; 3] = [
    SearchOption {
        id: OPTION_DATE_CONSUMED,
        table: tables::CONSUMPTIONS,
        field: "created_at",
        name: "Date consumed",
        datatype: DataType::Date,
        join: TICKET_TO_CONSUMPTION,
    },
    SearchOption {
        id: OPTION_CONSUMED,
        table: tables::CONSUMPTIONS,
        field: "consumed",
        name: "Consumed details",
        datatype: CONSUMED_DATATYPE,
        join: TICKET_TO_CONSUMPTION,
    },
    SearchOption {
        id: OPTION_VOUCHER_NAME,
        table: tables::VOUCHERS,
        field: "name",
        name: "Voucher name",
        datatype: DataType::Dropdown,
        join: JoinParams {
            link_field: "voucher_id",
            join_type: JoinType::Standard,
            before_join: Some(&TICKET_CONSUMPTION_JOIN),
        },
    },
];

const ENTITY_TO_VOUCHER: JoinParams = JoinParams {
    link_field: "entity_id",
    join_type: JoinType::Child,
    before_join: None,
};

const ENTITY_VOUCHER_JOIN: BeforeJoin = BeforeJoin {
    table: tables::VOUCHERS,
    join: ENTITY_TO_VOUCHER,
};

const VOUCHER_TO_CONSUMPTION: JoinParams = JoinParams {
    link_field: "voucher_id",
    join_type: JoinType::Child,
    before_join: Some(&ENTITY_VOUCHER_JOIN),
};

static ENTITY_OPTIONS: [SearchOption; 3] = [
    SearchOption {
        id: OPTION_DATE_CONSUMED,
        table: tables::CONSUMPTIONS,
        field: "created_at",
        name: "Date consumed",
        datatype: DataType::Date,
        join: VOUCHER_TO_CONSUMPTION,
    },
    SearchOption {
        id: OPTION_CONSUMED,
        table: tables::CONSUMPTIONS,
        field: "consumed",
        name: "Consumed details",
        datatype: CONSUMED_DATATYPE,
        join: VOUCHER_TO_CONSUMPTION,
    },
    SearchOption {
        id: OPTION_VOUCHER_NAME,
        table: tables::VOUCHERS,
        field: "name",
        name: "Voucher name",
        datatype: DataType::Dropdown,
        join: ENTITY_TO_VOUCHER,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_item_types_expose_the_same_columns() {
        for item_type in [ItemType::Ticket, ItemType::Entity] {
            let ids: Vec<u32> = item_type.search_options().iter().map(|o| o.id).collect();
            assert_eq!(
                ids,
                vec![OPTION_DATE_CONSUMED, OPTION_CONSUMED, OPTION_VOUCHER_NAME]
            );
        }
    }

    #[test]
    fn test_ticket_voucher_name_goes_through_consumptions() {
        let option = &ItemType::Ticket.search_options()[2];
        assert_eq!(
            option.join_path(),
            vec![
                JoinStep {
                    table: tables::CONSUMPTIONS,
                    link_field: "ticket_id",
                    join_type: JoinType::Child,
                },
                JoinStep {
                    table: tables::VOUCHERS,
                    link_field: "voucher_id",
                    join_type: JoinType::Standard,
                },
            ]
        );
    }

    #[test]
    fn test_entity_consumption_goes_through_vouchers() {
        let option = &ItemType::Entity.search_options()[0];
        let joined: Vec<&str> = option.join_path().iter().map(|s| s.table).collect();
        assert_eq!(joined, vec![tables::VOUCHERS, tables::CONSUMPTIONS]);
    }

    #[test]
    fn test_consumed_column_is_quarter_stepped_decimal() {
        let option = &ItemType::Ticket.search_options()[1];
        match option.datatype {
            DataType::Decimal {
                min,
                max,
                step,
                zero_label,
            } => {
                assert_eq!((min, max, step), (100, 1_000_000, 25));
                assert_eq!(zero_label, Some("Unlimited"));
            }
            other => panic!("unexpected datatype {:?}", other),
        }
    }

    #[test]
    fn test_item_type_parsing() {
        assert_eq!(ItemType::from_str("Ticket"), Some(ItemType::Ticket));
        assert_eq!(ItemType::from_str("entity"), Some(ItemType::Entity));
        assert_eq!(ItemType::from_str("computer"), None);
    }
}
