//! OpenAPI documentation

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, authors, books, health, loans, reservations, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Librarium API",
        version = "0.1.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::list_categories,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::get_user_loans,
        loans::create_loan,
        loans::update_loan,
        loans::return_loan,
        loans::extend_loan,
        loans::loan_stats,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::get_user_reservations,
        reservations::create_reservation,
        reservations::update_reservation,
        reservations::cancel_reservation,
        reservations::convert_reservation,
        reservations::reservation_stats,
        // Admin
        admin::get_stats,
        admin::get_activity,
        admin::check_overdue_loans,
        admin::check_expired_reservations,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::models::enums::BookStatus,
            crate::models::enums::ReservationStatus,
            crate::models::enums::LoanStatus,
            crate::models::enums::UserRole,
            crate::models::author::Author,
            crate::models::author::AuthorShort,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookStats,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::user::UserPublic,
            crate::models::user::RegisterUser,
            crate::models::user::LoginRequest,
            crate::models::user::UpdateUser,
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStats,
            crate::models::loan::CreateLoan,
            crate::models::loan::UpdateLoan,
            crate::models::loan::ExtendLoan,
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReservationStats,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::UpdateReservation,
            auth::LoginResponse,
            books::BookListResponse,
            authors::AuthorListResponse,
            users::UserListResponse,
            loans::LoanListResponse,
            reservations::ReservationListResponse,
            admin::AdminStats,
            admin::ActivityKind,
            admin::ActivityEntry,
            admin::SweepResponse,
            health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Authentication"),
        (name = "books", description = "Catalog books"),
        (name = "authors", description = "Catalog authors"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "reservations", description = "Reservation lifecycle"),
        (name = "admin", description = "Administration and sweeps"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the Swagger UI router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
