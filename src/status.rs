use std::fmt::Display;

use kdlogs_types::Response;

/// Message shown to the user after a request, if any
pub fn status_message(result: Result<Response, &dyn Display>) -> Option<String> {
    match result {
        Ok(Response { visible: 0 }) => Some("No logs found".to_string()),
        Ok(_) => None,
        Err(e) => Some(format!("Error: {}", e)),
    }
}
