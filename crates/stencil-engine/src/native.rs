//! Shared-library serving engine.
//!
//! The library must export the eight registration entry points with C
//! linkage. Every symbol is resolved when the library is loaded, so a
//! missing entry point fails startup before any route is declared.

use std::ffi::{c_char, c_int, CString};
use std::path::Path;
use std::ptr;

use libloading::Library;

use stencil_model::ServerConfig;

use crate::engine::ServingEngine;
use crate::error::EngineError;

type RegisterRouteFn =
    unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, *const c_char);
type RegisterRouteWithParamsFn = unsafe extern "C" fn(
    *const c_char,
    *const c_char,
    *const c_char,
    *const c_char,
    *const c_char,
);
type RegisterMiddlewareFn = unsafe extern "C" fn(*const c_char, c_int);
type RegisterDependencyFn = unsafe extern "C" fn(*const c_char, *const c_char);
type SetServerConfigFn = unsafe extern "C" fn(usize, usize, usize, usize, usize, *const c_char);
type SetLogLevelFn = unsafe extern "C" fn(*const c_char);
type SetIncludeDebugDataFn = unsafe extern "C" fn(c_int);
type StartServerFn = unsafe extern "C" fn();

struct Symbols {
    register_route: RegisterRouteFn,
    register_route_with_params: RegisterRouteWithParamsFn,
    register_middleware: RegisterMiddlewareFn,
    register_dependency: RegisterDependencyFn,
    set_server_config: SetServerConfigFn,
    set_log_level: SetLogLevelFn,
    set_include_debug_data: SetIncludeDebugDataFn,
    start_server: StartServerFn,
}

/// A serving engine loaded from a shared library.
pub struct NativeEngine {
    symbols: Symbols,
    // Keeps the symbol addresses valid; dropped after `symbols`.
    _library: Library,
}

impl std::fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEngine").finish_non_exhaustive()
    }
}

impl NativeEngine {
    /// Load the engine library and resolve all entry points.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();

        // SAFETY: loading runs the library's initialisers. The engine library
        // is supplied by the application operator.
        let library = unsafe { Library::new(path) }.map_err(|source| EngineError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let symbols = Symbols {
            register_route: symbol(&library, "RegisterRoute")?,
            register_route_with_params: symbol(&library, "RegisterRouteWithParams")?,
            register_middleware: symbol(&library, "RegisterMiddleware")?,
            register_dependency: symbol(&library, "RegisterDependency")?,
            set_server_config: symbol(&library, "SetServerConfig")?,
            set_log_level: symbol(&library, "SetLogLevel")?,
            set_include_debug_data: symbol(&library, "SetIncludeDebugData")?,
            start_server: symbol(&library, "StartServer")?,
        };

        stencil_telemetry::log_engine_loaded!(path = %path.display());

        Ok(Self {
            symbols,
            _library: library,
        })
    }
}

/// Platform file name for an engine library stem ("stencil_engine" ->
/// "libstencil_engine.so" on Linux).
pub fn library_filename(stem: &str) -> String {
    format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        stem,
        std::env::consts::DLL_SUFFIX
    )
}

fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, EngineError> {
    // SAFETY: every `T` used above matches the exported C signature.
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|s| *s)
        .map_err(|source| EngineError::MissingSymbol {
            symbol: name,
            source,
        })
}

fn text(field: &'static str, value: &str) -> Result<CString, EngineError> {
    CString::new(value).map_err(|source| EngineError::InvalidText { field, source })
}

fn native_int(field: &'static str, value: u64) -> Result<usize, EngineError> {
    usize::try_from(value).map_err(|_| EngineError::OutOfRange { field, value })
}

fn flag(enabled: bool) -> c_int {
    c_int::from(enabled)
}

impl ServingEngine for NativeEngine {
    fn register_route(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
    ) -> Result<(), EngineError> {
        let path = text("path", path)?;
        let method = text("method", method)?;
        let template = text("template", template)?;
        let description = text("description", description)?;
        // SAFETY: the pointers are valid NUL-terminated strings for the call.
        unsafe {
            (self.symbols.register_route)(
                path.as_ptr(),
                method.as_ptr(),
                template.as_ptr(),
                description.as_ptr(),
            )
        };
        Ok(())
    }

    fn register_route_with_params(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
        params_json: &str,
    ) -> Result<(), EngineError> {
        let path = text("path", path)?;
        let method = text("method", method)?;
        let template = text("template", template)?;
        let description = text("description", description)?;
        let params = text("params_json", params_json)?;
        // SAFETY: as above.
        unsafe {
            (self.symbols.register_route_with_params)(
                path.as_ptr(),
                method.as_ptr(),
                template.as_ptr(),
                description.as_ptr(),
                params.as_ptr(),
            )
        };
        Ok(())
    }

    fn register_middleware(&mut self, name: &str, enabled: bool) -> Result<(), EngineError> {
        let name = text("middleware name", name)?;
        // SAFETY: as above.
        unsafe { (self.symbols.register_middleware)(name.as_ptr(), flag(enabled)) };
        Ok(())
    }

    fn register_dependency(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        let name = text("dependency name", name)?;
        let value = text("dependency value", value)?;
        // SAFETY: as above.
        unsafe { (self.symbols.register_dependency)(name.as_ptr(), value.as_ptr()) };
        Ok(())
    }

    fn set_server_config(&mut self, config: &ServerConfig) -> Result<(), EngineError> {
        let read = native_int("read_timeout_ms", config.read_timeout_ms)?;
        let write = native_int("write_timeout_ms", config.write_timeout_ms)?;
        let idle = native_int("idle_timeout_ms", config.idle_timeout_ms)?;
        let max_body = native_int("max_body_size", config.max_body_size)?;
        let concurrency = native_int("concurrency", config.concurrency)?;
        let address = config
            .bind_address
            .as_deref()
            .map(|a| text("bind_address", a))
            .transpose()?;
        let address_ptr = address.as_ref().map_or(ptr::null(), |a| a.as_ptr());
        // SAFETY: `address_ptr` is null or points into `address`, which
        // outlives the call.
        unsafe {
            (self.symbols.set_server_config)(read, write, idle, max_body, concurrency, address_ptr)
        };
        Ok(())
    }

    fn set_log_level(&mut self, level: &str) -> Result<(), EngineError> {
        let level = text("log level", level)?;
        // SAFETY: as above.
        unsafe { (self.symbols.set_log_level)(level.as_ptr()) };
        Ok(())
    }

    fn set_include_debug_data(&mut self, enabled: bool) -> Result<(), EngineError> {
        // SAFETY: plain integer argument.
        unsafe { (self.symbols.set_include_debug_data)(flag(enabled)) };
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        // SAFETY: no arguments; blocks while the engine serves.
        unsafe { (self.symbols.start_server)() };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_a_load_error() {
        let err = NativeEngine::load("/nonexistent/libstencil_engine.so").unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
        assert!(err.to_string().starts_with("E2001"));
        assert!(err.to_string().contains("/nonexistent/libstencil_engine.so"));
    }

    #[test]
    fn load_error_keeps_loader_text_in_source_only() {
        use std::error::Error as _;

        let err = NativeEngine::load("/nonexistent/libstencil_engine.so").unwrap_err();
        let cause = err.source().expect("loader error is the source").to_string();
        assert!(!err.to_string().contains(&cause));
        assert_eq!(
            err.to_string(),
            "E2001: failed to load engine library /nonexistent/libstencil_engine.so"
        );
    }

    #[test]
    fn library_filename_uses_platform_affixes() {
        let name = library_filename("stencil_engine");
        assert!(name.contains("stencil_engine"));
        assert!(name.ends_with(std::env::consts::DLL_SUFFIX));
        if cfg!(target_os = "linux") {
            assert_eq!(name, "libstencil_engine.so");
        }
    }

    #[test]
    fn interior_nul_is_rejected() {
        let err = text("template", "a\0b").unwrap_err();
        assert!(matches!(err, EngineError::InvalidText { field: "template", .. }));
        assert_eq!(text("path", "/users").unwrap().as_bytes(), b"/users");
    }

    #[test]
    fn flags_are_zero_or_one() {
        assert_eq!(flag(true), 1);
        assert_eq!(flag(false), 0);
    }

    #[test]
    fn native_int_accepts_defaults() {
        let config = ServerConfig::default();
        assert_eq!(
            native_int("concurrency", config.concurrency).unwrap(),
            256 * 1024
        );
    }
}
