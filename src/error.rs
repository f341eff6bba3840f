use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Error taxonomy for the dashboard.
///
/// Every failure that can reach a route boundary is one of these variants.
/// The `Display` text (and anything wrapped inside a variant) is for the
/// server log only; clients are answered with [`AppError::user_message`],
/// which carries no internal detail.
#[derive(Debug, Error)]
pub enum AppError {
    /// Credentials missing/invalid, or the spreadsheet service is unreachable.
    #[error("spreadsheet connection failed: {0}")]
    Connection(String),

    /// The document exists but the requested worksheet tab does not.
    #[error("worksheet tab not found: {0}")]
    TabNotFound(String),

    /// Transport failure while fetching rows from an existing tab.
    #[error("row fetch failed: {0}")]
    Fetch(String),

    /// A view template failed to render.
    #[error("template render failed: {0}")]
    Template(String),

    /// Workbook serialization failed during export.
    #[error("workbook export failed: {0}")]
    Export(String),

    /// Login or office-gate rejection. Deliberately carries no detail about
    /// which half of the pair was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A guarded route was hit without a valid session.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl AppError {
    /// The message shown to the browser. Never includes wrapped error text.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Connection(_) => "Sheet connection error. Please try again later.",
            AppError::TabNotFound(_) => {
                "A required worksheet is missing. Please contact the operations team."
            }
            AppError::Fetch(_) => "Failed to load data from the sheet. Please reload the page.",
            AppError::Template(_) | AppError::Export(_) => {
                "Something went wrong while preparing this page."
            }
            AppError::InvalidCredentials => "كلمة المرور غير صحيحة",
            AppError::NotAuthenticated => "",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotAuthenticated => Redirect::to("/").into_response(),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.user_message()).into_response()
            }
            other => {
                log::error!("request failed: {other}");
                (StatusCode::INTERNAL_SERVER_ERROR, other.user_message()).into_response()
            }
        }
    }
}
