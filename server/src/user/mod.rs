use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use sea_orm::*;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::UserRole;
use crate::entities::user;

pub mod api;

/// Maximum number of accounts returned by a listing.
const USER_LIST_LIMIT: u64 = 50;

/// A registered account, as exposed to the rest of the application.
/// The password hash never leaves this module.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct User {
    id: Uuid,
    email: String,
    name: String,
    role: UserRole,
}

impl User {
    pub fn new(id: Uuid, email: String, name: String, role: UserRole) -> Self {
        Self {
            id,
            email,
            name,
            role,
        }
    }

    /// Returns the ID of the account.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the email address of the account.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name of the account.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the role of the account.
    pub fn role(&self) -> UserRole {
        self.role
    }
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        User::new(model.id, model.email, model.name, model.role)
    }
}

/// Error type for UserService operations.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// The email address is already taken by another account.
    #[error("Email already registered")]
    EmailAlreadyRegistered,
    /// The email/password pair did not match a stored account. Unknown
    /// emails and wrong passwords are deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Represents a user not found error.
    #[error("User with ID {0} not found")]
    UserNotFound(Uuid),
    /// Represents a password hashing or parsing failure.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct UserService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl UserService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> UserService {
        UserService { db }
    }

    /// Registers a new account with the default `user` role.
    ///
    /// # Arguments
    ///
    /// * `email` - The email address, used as the login identifier.
    /// * `password` - The plaintext password; stored only as an argon2 hash.
    /// * `name` - The display name of the account.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `User` if successful, or an error otherwise.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: String,
        password: &str,
        name: String,
    ) -> Result<User, UserServiceError> {
        if self.email_exists(&email).await? {
            return Err(UserServiceError::EmailAlreadyRegistered);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| UserServiceError::PasswordHash(err.to_string()))?
            .to_string();

        let now = chrono::Utc::now();
        let active_model = user::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            email: ActiveValue::Set(email),
            password_hash: ActiveValue::Set(password_hash),
            name: ActiveValue::Set(name),
            role: ActiveValue::Set(UserRole::User),
            last_login: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(User::from(created_model))
    }

    /// Verifies an email/password pair and stamps the login time.
    ///
    /// # Returns
    ///
    /// A `Result` containing the authenticated `User` if the credentials
    /// match, or `InvalidCredentials` otherwise.
    #[tracing::instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        let Some(model) = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await?
        else {
            return Err(UserServiceError::InvalidCredentials);
        };

        let parsed_hash = PasswordHash::new(&model.password_hash)
            .map_err(|err| UserServiceError::PasswordHash(err.to_string()))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Err(UserServiceError::InvalidCredentials);
        }

        let mut active_model: user::ActiveModel = model.into();
        active_model.last_login = ActiveValue::Set(Some(chrono::Utc::now()));
        let updated_model = active_model.update(self.db).await?;

        Ok(User::from(updated_model))
    }

    /// Checks whether an account with the given ID exists.
    /// Always issues a fresh lookup; results are never cached.
    #[tracing::instrument(skip(self))]
    pub async fn exists_by_id(&self, id: Uuid) -> Result<bool, UserServiceError> {
        let existing_user = user::Entity::find_by_id(id).one(self.db).await?;
        Ok(existing_user.is_some())
    }

    /// Retrieves an account by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `User` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User, UserServiceError> {
        let user_model = user::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(UserServiceError::UserNotFound(id))?;
        Ok(User::from(user_model))
    }

    /// Retrieves the first accounts, up to the listing limit.
    ///
    /// # Returns
    ///
    /// A `Result` containing a vector of `User` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_users(&self) -> Result<Vec<User>, UserServiceError> {
        let users = user::Entity::find()
            .limit(USER_LIST_LIMIT)
            .all(self.db)
            .await?
            .into_iter()
            .map(User::from)
            .collect();
        Ok(users)
    }

    /// Checks if an account with the given email address already exists.
    #[tracing::instrument(skip(self))]
    async fn email_exists(&self, email: &str) -> Result<bool, UserServiceError> {
        let existing_user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await?;
        Ok(existing_user.is_some())
    }
}
