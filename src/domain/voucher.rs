use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CreditTypeId, EntityId, Quantity};

pub type VoucherId = i64;

/// A named pool of credit granted to an entity.
/// What is left is never stored; it is derived from the consumption rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub entity_id: EntityId,
    pub name: String,
    pub type_id: Option<CreditTypeId>,
    /// Total quantity granted, in hundredths
    pub quantity: Quantity,
    pub is_active: bool,
    /// First day the voucher can be consumed
    pub begin_date: Option<DateTime<Utc>>,
    /// After this instant the voucher is expired
    pub end_date: Option<DateTime<Utc>>,
    /// Allow consumption beyond the granted quantity
    pub overconsumption_allowed: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Returns true once the end date has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }

    /// Returns true before the begin date.
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.begin_date.is_some_and(|begin| begin > now)
    }

    /// Returns true when consumption may be recorded at `now`.
    pub fn is_in_period(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.is_pending(now)
    }

    pub fn remaining(&self, consumed_total: Quantity) -> Quantity {
        self.quantity - consumed_total
    }
}

/// Input for creating a voucher. The id is assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewVoucher {
    pub entity_id: EntityId,
    pub name: String,
    pub type_id: Option<CreditTypeId>,
    pub quantity: Quantity,
    pub is_active: bool,
    pub begin_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub overconsumption_allowed: bool,
    pub comment: Option<String>,
}

impl NewVoucher {
    pub fn new(entity_id: EntityId, name: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            entity_id,
            name: name.into(),
            type_id: None,
            quantity,
            is_active: true,
            begin_date: None,
            end_date: None,
            overconsumption_allowed: false,
            comment: None,
        }
    }

    pub fn with_type(mut self, type_id: CreditTypeId) -> Self {
        self.type_id = Some(type_id);
        self
    }

    pub fn with_period(
        mut self,
        begin_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        self.begin_date = begin_date;
        self.end_date = end_date;
        self
    }

    pub fn with_overconsumption(mut self, allowed: bool) -> Self {
        self.overconsumption_allowed = allowed;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Build the stored voucher once the repository has assigned an id.
    pub fn into_voucher(self, id: VoucherId, created_at: DateTime<Utc>) -> Voucher {
        Voucher {
            id,
            entity_id: self.entity_id,
            name: self.name,
            type_id: self.type_id,
            quantity: self.quantity,
            is_active: self.is_active,
            begin_date: self.begin_date,
            end_date: self.end_date,
            overconsumption_allowed: self.overconsumption_allowed,
            comment: self.comment,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn voucher(begin: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Voucher {
        NewVoucher::new(1, "Support 2024", 10000)
            .with_period(begin, end)
            .into_voucher(1, Utc::now())
    }

    #[test]
    fn test_new_voucher_defaults() {
        let v = NewVoucher::new(7, "Hotline", 5000);
        assert!(v.is_active);
        assert!(!v.overconsumption_allowed);
        assert_eq!(v.type_id, None);
    }

    #[test]
    fn test_unbounded_voucher_is_always_in_period() {
        let v = voucher(None, None);
        assert!(v.is_in_period(Utc::now()));
        assert!(!v.is_expired(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn test_expired_voucher() {
        let now = Utc::now();
        let v = voucher(None, Some(now - Duration::days(1)));
        assert!(v.is_expired(now));
        assert!(!v.is_in_period(now));
    }

    #[test]
    fn test_pending_voucher() {
        let now = Utc::now();
        let v = voucher(Some(now + Duration::days(1)), None);
        assert!(v.is_pending(now));
        assert!(!v.is_expired(now));
        assert!(!v.is_in_period(now));
    }

    #[test]
    fn test_remaining_may_go_negative() {
        let v = voucher(None, None);
        assert_eq!(v.remaining(2500), 7500);
        assert_eq!(v.remaining(12000), -2000);
    }
}
