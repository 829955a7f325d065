use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::format_quantity;

use super::BalanceLine;

pub const TAG_TICKET_ID: &str = "##ticket.id##";
pub const TAG_LANG_VOUCHER: &str = "##lang.credit.voucher##";
pub const TAG_LANG_USED: &str = "##lang.credit.used##";
pub const TAG_LANG_LEFT: &str = "##lang.credit.left##";

/// Repeated block holding one entry per voucher.
pub const BLOCK_CREDIT_TICKET: &str = "credit.ticket";
pub const TAG_VOUCHER: &str = "##credit.voucher##";
pub const TAG_USED: &str = "##credit.used##";
pub const TAG_LEFT: &str = "##credit.left##";

/// Placeholder values handed to a notification template.
/// Scalar tags apply once; blocks repeat their entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    pub tags: BTreeMap<String, String>,
    pub blocks: BTreeMap<String, Vec<BTreeMap<String, String>>>,
}

impl NotificationData {
    pub fn set_tag(&mut self, tag: &str, value: impl Into<String>) {
        self.tags.insert(tag.to_string(), value.into());
    }

    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn block(&self, name: &str) -> &[BTreeMap<String, String>] {
        self.blocks.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn push_entry(&mut self, block: &str, entry: BTreeMap<String, String>) {
        self.blocks.entry(block.to_string()).or_default().push(entry);
    }
}

/// Add the credit labels and one `credit.ticket` entry per balance line.
pub fn add_credit_data(data: &mut NotificationData, lines: &[BalanceLine]) {
    data.set_tag(TAG_LANG_VOUCHER, "Credit voucher");
    data.set_tag(TAG_LANG_USED, "Quantity consumed");
    data.set_tag(TAG_LANG_LEFT, "Quantity remaining");

    for line in lines {
        let entry = BTreeMap::from([
            (TAG_VOUCHER.to_string(), line.voucher_name.clone()),
            (TAG_USED.to_string(), format_quantity(line.consumed_on_ticket)),
            (TAG_LEFT.to_string(), format_quantity(line.remaining)),
        ]);
        data.push_entry(BLOCK_CREDIT_TICKET, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_set_even_without_vouchers() {
        let mut data = NotificationData::default();
        add_credit_data(&mut data, &[]);

        assert_eq!(data.tag(TAG_LANG_USED), Some("Quantity consumed"));
        assert_eq!(data.tag(TAG_LANG_LEFT), Some("Quantity remaining"));
        assert!(data.block(BLOCK_CREDIT_TICKET).is_empty());
    }

    #[test]
    fn test_one_entry_per_line() {
        let mut data = NotificationData::default();
        data.set_tag(TAG_TICKET_ID, "7");
        add_credit_data(
            &mut data,
            &[
                BalanceLine {
                    voucher_id: 1,
                    voucher_name: "Hotline".into(),
                    consumed_on_ticket: 1025,
                    remaining: 8975,
                },
                BalanceLine {
                    voucher_id: 2,
                    voucher_name: "On-site".into(),
                    consumed_on_ticket: 0,
                    remaining: -50,
                },
            ],
        );

        let entries = data.block(BLOCK_CREDIT_TICKET);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0][TAG_VOUCHER], "Hotline");
        assert_eq!(entries[0][TAG_USED], "10.25");
        assert_eq!(entries[0][TAG_LEFT], "89.75");
        assert_eq!(entries[1][TAG_USED], "0.00");
        assert_eq!(entries[1][TAG_LEFT], "-0.50");
        assert_eq!(data.tag(TAG_TICKET_ID), Some("7"));
    }
}
