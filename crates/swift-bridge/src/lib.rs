//! C ABI bridge so a native share extension can drive one sharebridge
//! invocation with a JSON request.

#![allow(unsafe_code)]

use std::{
    ffi::{CStr, CString, c_char},
    panic::{AssertUnwindSafe, catch_unwind},
    sync::LazyLock,
};

use {
    serde::Serialize,
    serde_json::Value,
    sharebridge_config::{ShareConfig, env_subst::substitute_env},
    sharebridge_pipeline::{
        ExtensionContext, InvocationController, InvocationError, InvocationReport, JsonRequest,
    },
};

// ── Global bridge state ────────────────────────────────────────────────────

static RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap_or_else(|e| panic!("failed to create tokio runtime: {e}"))
});

// ── Request / Response types ───────────────────────────────────────────────

/// Bridge-only fields read alongside the share request itself.
#[derive(Debug, Default)]
struct BridgeOptions {
    /// Inline TOML config with `${VAR}` substitution. When absent, the
    /// config is discovered and `SHAREBRIDGE_*` overrides are applied.
    config_toml: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShareResponse {
    status: &'static str,
    items: usize,
    storage_root: String,
    woke: bool,
}

impl From<InvocationReport> for ShareResponse {
    fn from(report: InvocationReport) -> Self {
        Self {
            status: "completed",
            items: report.items,
            storage_root: report.storage_root.display().to_string(),
            woke: report.woke,
        }
    }
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    bridge_version: &'static str,
    config_path: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorPayload<'a> {
    code: &'a str,
    message: &'a str,
}

// ── Encoding helpers ───────────────────────────────────────────────────────

fn encode_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json,
        Err(_) => {
            "{\"error\":{\"code\":\"serialization_error\",\"message\":\"failed to serialize response\"}}"
                .to_owned()
        },
    }
}

fn encode_error(code: &str, message: &str) -> String {
    encode_json(&ErrorEnvelope {
        error: ErrorPayload { code, message },
    })
}

fn into_c_ptr(payload: String) -> *mut c_char {
    match CString::new(payload) {
        Ok(value) => value.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn with_ffi_boundary<F>(work: F) -> *mut c_char
where
    F: FnOnce() -> String,
{
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(payload) => into_c_ptr(payload),
        Err(_) => into_c_ptr(encode_error(
            "panic",
            "unexpected panic occurred in Rust FFI boundary",
        )),
    }
}

fn read_c_string(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Err("request_json pointer was null".to_owned());
    }

    // SAFETY: pointer nullability is checked above, and callers guarantee a
    // valid NUL-terminated C string for the duration of the call.
    let c_str = unsafe { CStr::from_ptr(ptr) };
    match c_str.to_str() {
        Ok(text) => Ok(text.to_owned()),
        Err(_) => Err("request_json was not valid UTF-8".to_owned()),
    }
}

fn resolve_config(options: &BridgeOptions) -> Result<ShareConfig, String> {
    match options.config_toml.as_deref() {
        Some(raw) => toml::from_str(&substitute_env(raw)).map_err(|e| e.to_string()),
        None => Ok(sharebridge_config::apply_env_overrides(
            sharebridge_config::discover_and_load(),
        )),
    }
}

/// Bridge options from a request that parsed as JSON. A request that did not
/// parse carries no options; its error is reported after the config is read.
fn read_options(request: &JsonRequest) -> Result<BridgeOptions, String> {
    match request.value().and_then(|value| value.get("config_toml")) {
        None | Some(Value::Null) => Ok(BridgeOptions::default()),
        Some(Value::String(raw)) => Ok(BridgeOptions {
            config_toml: Some(raw.clone()),
        }),
        Some(other) => Err(format!("`config_toml` must be a string, got {other}")),
    }
}

/// Forwards the OS-facing outcome into the log; the caller reads the
/// returned envelope.
struct LoggingContext;

impl ExtensionContext for LoggingContext {
    fn complete_request(&self) {
        trace_outcome("completed");
    }

    fn cancel_request(&self, domain: &'static str, _error: &InvocationError) {
        trace_outcome(domain);
    }
}

fn run_share(raw: &str) -> String {
    let request = JsonRequest::parse(raw);
    let config = match read_options(&request).and_then(|options| resolve_config(&options)) {
        Ok(config) => config,
        Err(message) => return encode_error("ConfigError", &message),
    };

    let controller = InvocationController::new(config);
    let outcome = RUNTIME.block_on(controller.execute(&request, &LoggingContext));
    match outcome {
        Ok(report) => encode_json(&ShareResponse::from(report)),
        Err(error) => encode_error(error.domain(), &error.to_string()),
    }
}

// ── Tracing helpers ────────────────────────────────────────────────────────

#[cfg(feature = "tracing")]
fn trace_call(function: &'static str) {
    tracing::debug!(target: "sharebridge_swift_bridge", function, "ffi call");
}

#[cfg(not(feature = "tracing"))]
fn trace_call(_function: &'static str) {}

#[cfg(feature = "tracing")]
fn trace_outcome(outcome: &'static str) {
    tracing::debug!(target: "sharebridge_swift_bridge", outcome, "invocation finished");
}

#[cfg(not(feature = "tracing"))]
fn trace_outcome(_outcome: &'static str) {}

// ── FFI exports ────────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn sharebridge_version() -> *mut c_char {
    trace_call("sharebridge_version");

    with_ffi_boundary(|| {
        let response = VersionResponse {
            bridge_version: env!("CARGO_PKG_VERSION"),
            config_path: sharebridge_config::find_or_default_config_path()
                .display()
                .to_string(),
        };
        encode_json(&response)
    })
}

/// Runs one share invocation to completion on the bridge runtime.
///
/// Returns `{"status":"completed",...}` or `{"error":{"code","message"}}`,
/// where `code` is the cancellation error domain.
#[unsafe(no_mangle)]
pub extern "C" fn sharebridge_share_json(request_json: *const c_char) -> *mut c_char {
    trace_call("sharebridge_share_json");

    with_ffi_boundary(|| match read_c_string(request_json) {
        Ok(raw) => run_share(&raw),
        Err(message) => encode_error("null_pointer_or_invalid_utf8", &message),
    })
}

#[unsafe(no_mangle)]
/// # Safety
///
/// `ptr` must either be null or a pointer previously returned by one of the
/// `sharebridge_*` FFI functions from this crate. Passing any other pointer,
/// or freeing the same pointer more than once, is undefined behavior.
pub unsafe extern "C" fn sharebridge_free_string(ptr: *mut c_char) {
    trace_call("sharebridge_free_string");

    if ptr.is_null() {
        return;
    }

    // SAFETY: pointer must originate from `CString::into_raw` in this crate.
    let _ = unsafe { CString::from_raw(ptr) };
}
