use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of staff roles. Credential handling is driven by the capability
/// methods below instead of ad-hoc string lists, so adding a role forces a
/// decision here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    Employee,
    Kassa,
}

impl Role {
    /// Login and password are mandatory for these roles.
    pub fn requires_credentials(&self) -> bool {
        matches!(self, Role::Admin | Role::Employee)
    }

    /// A password hash may be stored for these roles; anyone else never
    /// receives stored credentials.
    pub fn stores_credentials(&self) -> bool {
        matches!(self, Role::Admin | Role::Employee | Role::Kassa)
    }

    /// Agents are field workers and may not sign in.
    pub fn may_sign_in(&self) -> bool {
        !matches!(self, Role::Agent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Employee => "employee",
            Role::Kassa => "kassa",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub login: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub position: String,
    pub address: Option<String>,
    pub salary: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub phone: String,
    pub login: Option<String>,
    pub password: Option<String>,
    pub role: Role,
    pub position: Option<String>,
    pub address: Option<String>,
    pub salary: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStaffRequest {
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub position: Option<String>,
    pub address: Option<String>,
    pub salary: Option<i64>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StaffPublic {
    pub id: Uuid,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub phone: String,
    pub login: Option<String>,
    pub role: Role,
    pub position: String,
    pub address: Option<String>,
    pub salary: i64,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&Staff> for StaffPublic {
    fn from(s: &Staff) -> Self {
        Self {
            id: s.id,
            first_name: s.first_name.clone(),
            last_name: s.last_name.clone(),
            phone: s.phone.clone(),
            login: s.login.clone(),
            role: s.role,
            position: s.position.clone(),
            address: s.address.clone(),
            salary: s.salary,
            is_active: s.is_active,
            created_at: s.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_capability_table() {
        assert!(Role::Admin.requires_credentials());
        assert!(Role::Employee.requires_credentials());
        assert!(!Role::Kassa.requires_credentials());
        assert!(!Role::Agent.requires_credentials());

        assert!(Role::Admin.stores_credentials());
        assert!(Role::Employee.stores_credentials());
        assert!(Role::Kassa.stores_credentials());
        assert!(!Role::Agent.stores_credentials());
    }

    #[test]
    fn only_agents_are_barred_from_sign_in() {
        assert!(Role::Admin.may_sign_in());
        assert!(Role::Employee.may_sign_in());
        assert!(Role::Kassa.may_sign_in());
        assert!(!Role::Agent.may_sign_in());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Kassa).unwrap(), "\"kassa\"");
        let parsed: Role = serde_json::from_str("\"agent\"").unwrap();
        assert_eq!(parsed, Role::Agent);
    }

    #[test]
    fn staff_never_serializes_password_hash() {
        let staff = Staff {
            id: Uuid::new_v4(),
            first_name: "Aziz".into(),
            last_name: "Karimov".into(),
            phone: "+998901234567".into(),
            login: Some("aziz".into()),
            password_hash: Some("$2b$10$secret".into()),
            role: Role::Admin,
            position: "Manager".into(),
            address: None,
            salary: 5_000_000,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&staff).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
    }
}
