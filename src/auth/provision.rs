// Out-of-band admin provisioning for the `create-admin` command
use anyhow::{anyhow, bail};

use crate::auth::password;
use crate::auth::validation::{self, AccountRules};
use crate::db::models::Role;
use crate::db::users::{self, NewUser};
use crate::state::DbPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    Created { id: String },
    Promoted { id: String },
    AlreadyAdmin { id: String },
}

pub struct AdminRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub password: Option<&'a str>,
}

/// Promote the account matching the username or email, or create a new admin account.
pub fn provision_admin(
    pool: &DbPool,
    rules: &AccountRules,
    bcrypt_cost: u32,
    request: AdminRequest<'_>,
) -> anyhow::Result<Provisioned> {
    let username = rules
        .username(request.username)
        .map_err(|e| anyhow!("{}", e))?;
    let email = rules.email(request.email).map_err(|e| anyhow!("{}", e))?;

    let existing = match users::find_by_username(pool, &username)? {
        Some(user) => Some(user),
        None => users::find_by_email(pool, &email)?,
    };

    if let Some(user) = existing {
        if user.is_admin() {
            return Ok(Provisioned::AlreadyAdmin { id: user.id });
        }
        users::set_role(pool, &user.id, Role::Admin)?;
        tracing::info!("Promoted {} to admin", user.username);
        return Ok(Provisioned::Promoted { id: user.id });
    }

    let Some(raw_password) = request.password else {
        bail!("A password is required to create a new admin account");
    };
    validation::password(raw_password).map_err(|e| anyhow!("{}", e))?;

    let name = request.name.trim();
    let user = users::create(
        pool,
        NewUser {
            name: if name.is_empty() { "Admin" } else { name }.to_string(),
            username,
            email,
            password_hash: password::hash(raw_password, bcrypt_cost)?,
            role: Role::Admin,
            branch: None,
            graduation_year: None,
            is_alumni: false,
        },
    )?;
    tracing::info!("Created admin account {}", user.username);
    Ok(Provisioned::Created { id: user.id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;

    fn request<'a>(password: Option<&'a str>) -> AdminRequest<'a> {
        AdminRequest {
            username: "root_admin",
            email: "root@marwadiuniversity.ac.in",
            name: "Root",
            password,
        }
    }

    #[test]
    fn creates_new_admin() {
        let (pool, _tmp) = migrated_pool();
        let rules = AccountRules::new().unwrap();

        let outcome = provision_admin(&pool, &rules, 4, request(Some("s3cret!"))).unwrap();
        let Provisioned::Created { id } = outcome else {
            panic!("expected a new account, got {:?}", outcome);
        };
        let user = users::find_by_id(&pool, &id).unwrap().unwrap();
        assert!(user.is_admin());
        assert!(password::verify("s3cret!", &user.password_hash));
    }

    #[test]
    fn promotes_existing_user_and_is_idempotent() {
        let (pool, _tmp) = migrated_pool();
        let rules = AccountRules::new().unwrap();
        let student = users::create(
            &pool,
            NewUser {
                name: "Student".into(),
                username: "root_admin".into(),
                email: "someone@marwadiuniversity.ac.in".into(),
                password_hash: "x".into(),
                role: Role::Student,
                branch: None,
                graduation_year: None,
                is_alumni: false,
            },
        )
        .unwrap();

        let outcome = provision_admin(&pool, &rules, 4, request(None)).unwrap();
        assert_eq!(outcome, Provisioned::Promoted { id: student.id.clone() });
        assert!(users::find_by_id(&pool, &student.id)
            .unwrap()
            .unwrap()
            .is_admin());

        let again = provision_admin(&pool, &rules, 4, request(None)).unwrap();
        assert_eq!(again, Provisioned::AlreadyAdmin { id: student.id });
    }

    #[test]
    fn new_account_needs_a_valid_password() {
        let (pool, _tmp) = migrated_pool();
        let rules = AccountRules::new().unwrap();
        assert!(provision_admin(&pool, &rules, 4, request(None)).is_err());
        assert!(provision_admin(&pool, &rules, 4, request(Some("123"))).is_err());
    }
}
