//! # Authentication Middleware for Actix-web
//!
//! Extracts and validates JWT tokens from HTTP requests.
//!
//! ## Overview
//!
//! This module provides:
//!
//! | Component | Purpose | Usage |
//! |-----------|---------|-------|
//! | [`AuthMiddleware`] | Extract and validate JWT | Service-level authentication |
//! | [`AuthenticatedUser`] | Extractor for handlers | Get current user in handlers |
//! | [`RequireRole`] | Route guards | Restrict routes by role |
//! | [`UserRole`] | Role enum | Define user permissions |
//!
//! ## Authentication Flow
//!
//! ```text
//! ┌─────────┐     ┌──────────────┐     ┌─────────────┐     ┌─────────┐
//! │ Request │────►│ AuthMiddleware│────►│ Extract JWT │────►│ Validate│
//! └─────────┘     └──────────────┘     └─────────────┘     └────┬────┘
//!                                                                │
//!                 ┌──────────────┐     ┌─────────────┐          │
//!                 │   Handler    │◄────│ Insert User │◄─────────┘
//!                 │(AuthenticUser)│     │ Extension   │     (if valid)
//!                 └──────────────┘     └─────────────┘
//! ```
//!
//! ## Role Hierarchy
//!
//! Roles have a two-level permission model:
//!
//! ```text
//! Admin ─────────────────────────────────────►  Can do everything
//!   │
//!   └─► User ───────────────────────────────►  Can access own resources
//! ```
//!
//! ## Usage Example
//!
//! ### Setup Middleware
//!
//! ```rust,ignore
//! use shared::auth::{AuthMiddleware, JwtService};
//! use std::sync::Arc;
//!
//! let jwt_service = Arc::new(JwtService::new(config.jwt));
//! let auth_middleware = AuthMiddleware::new(jwt_service);
//!
//! // Apply to protected routes
//! App::new()
//!     .service(
//!         web::scope("/api")
//!             .wrap(auth_middleware)
//!             .route("/profile", web::get().to(get_profile))
//!     )
//! ```
//!
//! ### Use in Handlers
//!
//! ```rust,ignore
//! use shared::auth::AuthenticatedUser;
//!
//! // The user is automatically extracted from the validated token
//! async fn get_profile(user: AuthenticatedUser) -> impl Responder {
//!     format!("Hello, {}!", user.email)
//! }
//! ```
//!
//! ### Role-Based Guards
//!
//! ```rust,ignore
//! use shared::auth::RequireRole;
//!
//! // Only admins can access this route
//! #[get("/admin/users", guard = "RequireRole::admin")]
//! async fn list_users(user: AuthenticatedUser) -> impl Responder {
//!     // Only reaches here if user is admin
//! }
//! ```
//!
//! ## Related Documentation
//!
//! - [`crate::auth::jwt`] - JWT token validation
//! - [`crate::errors::ApiError`] - Authentication errors

use crate::auth::jwt::{Claims, JwtService};
use crate::errors::ApiError;
use actix_web::{dev::ServiceRequest, Error, HttpMessage};
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// Authenticated User
// =============================================================================

/// Represents an authenticated user extracted from a JWT.
///
/// This struct is inserted into request extensions after successful
/// authentication and can be extracted in handlers.
///
/// ## Fields
///
/// - `user_id`: The user's unique identifier (from JWT `sub` claim)
/// - `email`: User's email address (for display/logging)
/// - `role`: User's role for authorization checks
///
/// ## Example
///
/// ```rust,ignore
/// async fn handler(user: AuthenticatedUser) -> impl Responder {
///     if user.role.has_permission(UserRole::Admin) {
///         // User is admin
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The user's unique identifier (UUID)
    pub user_id: Uuid,
    /// User's email address
    pub email: String,
    /// User's role for authorization
    pub role: UserRole,
}

// =============================================================================
// User Roles
// =============================================================================

/// System user roles with a two-level permission model.
///
/// ## Permission Hierarchy
///
/// | Role | Can Access |
/// |------|------------|
/// | Admin | Everything, including admin-only routes |
/// | User | Their own resources only |
///
/// ## Usage
///
/// ```rust,ignore
/// // Check if user has required permission
/// if user.role.has_permission(UserRole::Admin) {
///     // User is admin
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    /// Basic user role - can access their own resources
    User,
    /// Full system access - explicit admin routes only
    Admin,
}

impl UserRole {
    /// Parses a role from a string (case-insensitive).
    ///
    /// ## Returns
    ///
    /// - `Some(role)` if the string matches a known role
    /// - `None` if the string is not recognized
    ///
    /// ## Examples
    ///
    /// ```rust,ignore
    /// assert_eq!(UserRole::from_str("user"), Some(UserRole::User));
    /// assert_eq!(UserRole::from_str("ADMIN"), Some(UserRole::Admin));
    /// assert_eq!(UserRole::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    ///
    /// Used when storing roles in JWT or database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Checks if this role has at least the required permission level.
    ///
    /// Invariant 3 of the data model: ownership checks gate every mutation
    /// path, and admin may bypass ownership only on routes explicitly
    /// guarded with `RequireRole::admin`. This method never implies
    /// ownership by itself.
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// let admin = UserRole::Admin;
    /// assert!(admin.has_permission(UserRole::Admin));
    /// assert!(admin.has_permission(UserRole::User));
    ///
    /// let user = UserRole::User;
    /// assert!(!user.has_permission(UserRole::Admin));
    /// assert!(user.has_permission(UserRole::User));
    /// ```
    pub fn has_permission(&self, required: Self) -> bool {
        match (self, required) {
            (Self::Admin, _) => true,
            (Self::User, Self::User) => true,
            _ => false,
        }
    }
}

/// Converts JWT claims to an authenticated user.
impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            // Default to User if role is unknown
            role: UserRole::from_str(&claims.role).unwrap_or(UserRole::User),
        }
    }
}

// =============================================================================
// Auth Middleware
// =============================================================================

/// Middleware for JWT-based authentication.
///
/// This middleware:
/// 1. Extracts the JWT from the `Authorization` header
/// 2. Validates the token signature and claims
/// 3. Inserts the authenticated user into request extensions
///
/// ## Setup
///
/// ```rust,ignore
/// let jwt_service = Arc::new(JwtService::new(config.jwt));
/// let auth = AuthMiddleware::new(jwt_service);
///
/// App::new()
///     .service(
///         web::scope("/api")
///             .wrap(auth)
///             .route("/protected", web::get().to(handler))
///     )
/// ```
#[derive(Clone)]
pub struct AuthMiddleware {
    /// JWT service for token validation
    jwt_service: Arc<JwtService>,
}

impl AuthMiddleware {
    /// Creates a new authentication middleware.
    ///
    /// ## Parameters
    ///
    /// - `jwt_service`: Shared JWT service for token validation
    pub fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }

    /// Extracts and validates the user from a request.
    ///
    /// This is the core authentication logic:
    /// 1. Get the `Authorization` header
    /// 2. Extract the Bearer token
    /// 3. Validate the JWT
    /// 4. Convert claims to `AuthenticatedUser`
    ///
    /// ## Errors
    ///
    /// - `ApiError::MissingAuth` - No Authorization header
    /// - `ApiError::InvalidToken` - Malformed token or invalid signature
    /// - `ApiError::TokenExpired` - Token has expired
    pub fn extract_user(&self, req: &ServiceRequest) -> Result<AuthenticatedUser, ApiError> {
        let token = self.extract_token(req)?;
        let claims = self.jwt_service.validate_access_token(&token)?;
        Ok(AuthenticatedUser::from(claims))
    }

    /// Locates the access token, preferring the `Authorization` header and
    /// falling back to the `access_token` cookie. The embedded widget runs
    /// inside a third-party page and sometimes can't attach a custom header
    /// to same-origin XHRs it doesn't control, so the cookie set at login
    /// has to work on its own.
    fn extract_token(&self, req: &ServiceRequest) -> Result<String, ApiError> {
        if let Some(header) = req.headers().get("Authorization").and_then(|h| h.to_str().ok()) {
            return JwtService::extract_from_header(header).map(|t| t.to_string());
        }
        req.cookie("access_token")
            .map(|c| c.value().to_string())
            .ok_or(ApiError::MissingAuth)
    }

    /// Authenticates a request and stores the user in extensions.
    ///
    /// Call this from middleware to authenticate the request.
    /// The user will be available via the `AuthenticatedUser` extractor.
    ///
    /// ## Errors
    ///
    /// Returns authentication errors if the token is missing or invalid.
    pub fn authenticate(&self, req: &ServiceRequest) -> Result<(), ApiError> {
        let user = self.extract_user(req)?;
        // Store in request extensions for later extraction
        req.extensions_mut().insert(user);
        Ok(())
    }
}

// =============================================================================
// Actix-web Extractor
// =============================================================================

/// Extractor for getting the authenticated user in handlers.
///
/// This implements Actix-web's `FromRequest` trait, allowing you to
/// simply add `AuthenticatedUser` as a handler parameter.
///
/// ## Example
///
/// ```rust,ignore
/// // User is automatically extracted from request extensions
/// async fn handler(user: AuthenticatedUser) -> impl Responder {
///     format!("Hello, {}!", user.email)
/// }
/// ```
///
/// ## Errors
///
/// Returns `ApiError::MissingAuth` if no user is in request extensions.
/// This happens if authentication middleware wasn't applied.
impl actix_web::FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        // Try to get the user from request extensions
        let result = req
            .extensions()
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::MissingAuth.into());

        std::future::ready(result)
    }
}

// =============================================================================
// Role Guards
// =============================================================================

/// Route guards for role-based access control.
///
/// Use these as guards in route definitions to restrict access
/// based on user role.
///
/// ## Example
///
/// ```rust,ignore
/// use actix_web::{get, Responder};
/// use shared::auth::{RequireRole, AuthenticatedUser};
///
/// // Only admins can access
/// #[get("/admin/dashboard", guard = "RequireRole::admin")]
/// async fn admin_dashboard(user: AuthenticatedUser) -> impl Responder {
///     "Admin dashboard"
/// }
/// ```
pub struct RequireRole;

impl RequireRole {
    /// Guard that requires at least User role.
    ///
    /// Effectively means "any authenticated user".
    pub fn user(req: &actix_web::guard::GuardContext) -> bool {
        Self::check_role(req, UserRole::User)
    }

    /// Guard that requires Admin role.
    ///
    /// Only allows Admins; used for the explicit admin-bypass routes
    /// named in invariant 3 of the data model.
    pub fn admin(req: &actix_web::guard::GuardContext) -> bool {
        Self::check_role(req, UserRole::Admin)
    }

    /// Internal helper to check if user has required role.
    fn check_role(req: &actix_web::guard::GuardContext, required: UserRole) -> bool {
        req.req_data()
            .get::<AuthenticatedUser>()
            .map(|user| user.role.has_permission(required))
            .unwrap_or(false)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("user"), Some(UserRole::User));
        assert_eq!(UserRole::from_str("ADMIN"), Some(UserRole::Admin));

        // Unknown role returns None
        assert_eq!(UserRole::from_str("unknown"), None);
        assert_eq!(UserRole::from_str(""), None);
    }

    #[test]
    fn test_user_role_as_str() {
        assert_eq!(UserRole::User.as_str(), "user");
        assert_eq!(UserRole::Admin.as_str(), "admin");
    }

    #[test]
    fn test_admin_has_all_permissions() {
        assert!(UserRole::Admin.has_permission(UserRole::Admin));
        assert!(UserRole::Admin.has_permission(UserRole::User));
    }

    #[test]
    fn test_user_permissions() {
        assert!(!UserRole::User.has_permission(UserRole::Admin));
        assert!(UserRole::User.has_permission(UserRole::User));
    }

    #[test]
    fn test_authenticated_user_from_claims() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: "admin".to_string(),
            iss: "test".to_string(),
            aud: "test".to_string(),
            exp: 0,
            iat: 0,
            jti: Uuid::new_v4(),
            token_type: crate::auth::jwt::TokenType::Access,
        };

        let user = AuthenticatedUser::from(claims.clone());

        assert_eq!(user.user_id, claims.sub);
        assert_eq!(user.email, claims.email);
        assert_eq!(user.role, UserRole::Admin);
    }

    #[test]
    fn test_unknown_role_defaults_to_user() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: "unknown_role".to_string(),
            iss: "test".to_string(),
            aud: "test".to_string(),
            exp: 0,
            iat: 0,
            jti: Uuid::new_v4(),
            token_type: crate::auth::jwt::TokenType::Access,
        };

        let user = AuthenticatedUser::from(claims);

        // Unknown role defaults to User for safety
        assert_eq!(user.role, UserRole::User);
    }
}
