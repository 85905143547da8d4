use std::fmt::Display;

use kd_core::KdError;

fn map_error(code: &'static str, error: impl Display) -> KdError {
    KdError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: KdError) -> i32 {
    log::debug!("command failed: {}", error);
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).expect("string json")
    );
    1
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> KdError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> KdError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_output(error: serde_json::Error) -> KdError {
    map_error("CLI_OUTPUT", error)
}
