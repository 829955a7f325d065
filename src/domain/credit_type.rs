use serde::{Deserialize, Serialize};

pub type CreditTypeId = i64;

/// Classification for vouchers (e.g. "Remote support", "On-site").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditType {
    pub id: CreditTypeId,
    pub name: String,
    pub comment: Option<String>,
}
