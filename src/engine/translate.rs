// Copyright 2026 The Tutorline Project
// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;

use crate::stream::Notice;

/// Map a non-success upstream status to the notice shown to the user.
///
/// Only called once the status is known to be a failure, before any frame of
/// the upstream body is parsed.
pub fn notice_for_status(status: StatusCode) -> Notice {
    match status {
        StatusCode::UNAUTHORIZED => Notice::AuthenticationFailed,
        StatusCode::TOO_MANY_REQUESTS => Notice::RateLimited,
        StatusCode::INTERNAL_SERVER_ERROR => Notice::ServerError,
        _ => Notice::ServiceUnavailable,
    }
}
