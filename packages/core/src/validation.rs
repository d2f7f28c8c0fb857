//! Checks applied to user-supplied input before it reaches a store.
//!
//! Profile fields (display name, handle, email) and listing page parameters
//! are validated here so every backend rejects the same input with the same
//! [`ValidationError`].

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::PageParams;

/// Longest display name accepted, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,30}$").expect("static regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

/// Errors returned when user-supplied profile fields or paging input are
/// rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("display_name must not be empty")]
    EmptyDisplayName,

    #[error("display_name must be at most {MAX_DISPLAY_NAME_CHARS} characters, got {0}")]
    DisplayNameTooLong(usize),

    #[error(
        "handle must be 3-30 characters of letters, digits, '_' or '.', got: {0:?}"
    )]
    InvalidHandle(String),

    #[error("email is not a valid address: {0:?}")]
    InvalidEmail(String),

    #[error("page and limit must be positive, got page={page} limit={limit}")]
    InvalidPage { page: u32, limit: u32 },
}

pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDisplayName);
    }
    let chars = trimmed.chars().count();
    if chars > MAX_DISPLAY_NAME_CHARS {
        return Err(ValidationError::DisplayNameTooLong(chars));
    }
    Ok(())
}

pub fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    if !HANDLE_RE.is_match(handle) {
        return Err(ValidationError::InvalidHandle(handle.to_string()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Check every field a new registration carries, in field order.
pub fn validate_profile(display_name: &str, handle: &str, email: &str) -> Result<(), ValidationError> {
    validate_display_name(display_name)?;
    validate_handle(handle)?;
    validate_email(email)?;
    Ok(())
}

/// Reject non-positive paging input and cap `limit` at `max_limit`.
pub fn validate_page(params: PageParams, max_limit: u32) -> Result<PageParams, ValidationError> {
    if params.page < 1 || params.limit < 1 {
        return Err(ValidationError::InvalidPage {
            page: params.page,
            limit: params.limit,
        });
    }
    Ok(PageParams {
        page: params.page,
        limit: params.limit.min(max_limit.max(1)),
    })
}
