//! The hosted postgres database.
//!
//! Auth accounts live in ``auth.users`` (passwords are bcrypt hashes checked
//! with pgcrypto's ``crypt``), everything else in the ``public`` schema.
//! See ``other/schema.sql`` for the tables used.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::EncodingKey;
use log::{debug, info};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    classify, AdminContacts, Approval, AuthUser, Backend, BackendError, Role, SignUpRequest,
    SignedIn, Store, UserProfile,
};
use crate::auth::{token::TokenPair, Session};

const PROFILE_COLUMNS: &str = "user_id, email, username, whatsapp, is_approved, created_at, approved_at, approved_by";

pub struct PgBackend {
    pool: PgPool,
    key: EncodingKey,
}

impl PgBackend {
    pub fn new(pool: PgPool, key: EncodingKey) -> Self {
        Self { pool, key }
    }
}

#[derive(sqlx::FromRow)]
struct SignInRow {
    id: Uuid,
    email: String,
    password_ok: bool,
    email_confirmed_at: Option<DateTime<Utc>>,
    is_approved: Option<bool>,
}

#[async_trait]
impl Backend for PgBackend {
    async fn sign_in_with_email(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError> {
        let row = sqlx::query_as::<_, SignInRow>(
            r#"
            SELECT
                u.id,
                u.email,
                COALESCE(u.encrypted_password = crypt($2, u.encrypted_password), false) AS password_ok,
                u.email_confirmed_at,
                p.is_approved
            FROM auth.users u
            LEFT JOIN public.profiles p ON p.user_id = u.id
            WHERE lower(u.email) = lower($1)
            "#,
        )
        .bind(email)
        .bind(password)
        .fetch_optional(&self.pool)
        .await?;

        // unknown email and wrong password look the same to the client
        let row = match row {
            Some(row) if row.password_ok => row,
            _ => return Err(BackendError::InvalidCredentials),
        };
        if row.email_confirmed_at.is_none() {
            return Err(BackendError::EmailNotConfirmed);
        }
        if !row.is_approved.unwrap_or(false) {
            return Err(BackendError::AwaitingApproval);
        }

        let session = Session::new(row.id, remember_me, Utc::now());
        let tokens = TokenPair::new(session, &self.key)?;
        info!("user {} signed in", row.id);
        Ok(SignedIn {
            user: AuthUser {
                id: row.id,
                email: row.email,
            },
            tokens,
        })
    }

    async fn sign_in_with_username(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SignedIn, BackendError> {
        let email: Option<String> =
            sqlx::query_scalar("SELECT email FROM public.profiles WHERE lower(username) = lower($1)")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        match email {
            Some(email) => {
                debug!("username {} resolved to an email", username);
                self.sign_in_with_email(&email, password, remember_me).await
            }
            None => Err(BackendError::UnknownUsername),
        }
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<UserProfile, BackendError> {
        let mut tx = self.pool.begin().await?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM public.profiles WHERE lower(username) = lower($1))",
        )
        .bind(&request.username)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(BackendError::AlreadyRegistered);
        }

        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO auth.users (
                instance_id, id, aud, role, email, encrypted_password,
                raw_app_meta_data, raw_user_meta_data, created_at, updated_at
            ) VALUES (
                '00000000-0000-0000-0000-000000000000', gen_random_uuid(),
                'authenticated', 'authenticated', $1, crypt($2, gen_salt('bf')),
                '{"provider": "email", "providers": ["email"]}'::jsonb,
                jsonb_build_object('username', $3::text), now(), now()
            )
            RETURNING id
            "#,
        )
        .bind(&request.email)
        .bind(&request.password)
        .bind(&request.username)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, BackendError::AlreadyRegistered))?;

        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            INSERT INTO public.profiles (user_id, email, username, whatsapp, is_approved)
            VALUES ($1, $2, $3, $4, false)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.whatsapp)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, BackendError::AlreadyRegistered))?;

        tx.commit().await?;
        info!("user {} signed up and waits for approval", user_id);
        Ok(profile)
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, BackendError> {
        Ok(sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM public.profiles ORDER BY created_at DESC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, BackendError> {
        Ok(sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM public.profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_approval(
        &self,
        user_id: Uuid,
        approval: Option<Approval>,
    ) -> Result<(), BackendError> {
        let result = sqlx::query(
            r#"
            UPDATE public.profiles
            SET is_approved = $2, approved_by = $3, approved_at = $4
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(approval.is_some())
        .bind(approval.map(|a| a.by))
        .bind(approval.map(|a| a.at))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn insert_role(&self, user_id: Uuid, role: Role) -> Result<(), BackendError> {
        sqlx::query("INSERT INTO public.user_roles (user_id, role) VALUES ($1, $2::app_role)")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, BackendError::Duplicate))?;
        Ok(())
    }

    async fn roles(&self, user_id: Uuid) -> Result<Vec<Role>, BackendError> {
        let roles: Vec<String> =
            sqlx::query_scalar("SELECT role::text FROM public.user_roles WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(roles.iter().filter_map(|r| Role::parse(r)).collect())
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<(), BackendError> {
        let result = sqlx::query("DELETE FROM public.profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn delete_auth_user(&self, user_id: Uuid) -> Result<(), BackendError> {
        let result = sqlx::query("DELETE FROM auth.users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn admin_contacts(&self, user_id: Uuid) -> Result<AdminContacts, BackendError> {
        sqlx::query_as::<_, AdminContacts>(
            "SELECT admin_whatsapp, admin_instagram FROM public.profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BackendError::NotFound)
    }

    async fn admin_contacts_by_email(&self, email: &str) -> Result<AdminContacts, BackendError> {
        Ok(sqlx::query_as::<_, AdminContacts>(
            "SELECT admin_whatsapp, admin_instagram FROM public.profiles WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or_default())
    }

    async fn save_admin_contacts(
        &self,
        user_id: Uuid,
        contacts: &AdminContacts,
    ) -> Result<(), BackendError> {
        let result = sqlx::query(
            "UPDATE public.profiles SET admin_whatsapp = $2, admin_instagram = $3 WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(&contacts.admin_whatsapp)
        .bind(&contacts.admin_instagram)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn stores(&self, user_id: Uuid) -> Result<Vec<Store>, BackendError> {
        Ok(sqlx::query_as::<_, Store>(
            "SELECT id, name FROM public.stores WHERE owner_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
