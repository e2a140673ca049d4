use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::booking::PaymentType;
use crate::models::salary::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum ExpenseKind {
    Income,
    Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub kind: ExpenseKind,
    pub payment_method: PaymentType,
    pub currency: Currency,
    pub category: String,
    pub amount: i64,
    pub description: String,
    pub worker_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub kind: ExpenseKind,
    #[serde(rename = "paymentMethod")]
    pub payment_method: PaymentType,
    pub currency: Currency,
    pub category: String,
    pub amount: i64,
    pub description: String,
    #[serde(rename = "workerId")]
    pub worker_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateExpenseRequest {
    pub kind: Option<ExpenseKind>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: Option<PaymentType>,
    pub currency: Option<Currency>,
    pub category: Option<String>,
    pub amount: Option<i64>,
    pub description: Option<String>,
}
