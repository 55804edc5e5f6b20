//! File-backed module loader.
//!
//! - a file starting with `#!` is a CGI-style handler run by that interpreter
//! - anything else is a [`TextTemplate`]
//!
//! Loaded modules are kept in a registry until unloaded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use dashmap::DashMap;

use super::{Handler, LoadError, Loaded, ModuleLoader, TextTemplate, path_for};
use crate::core::{Request, Response};
use crate::utils::exec::Cmd;
use crate::utils::mime::types;

/// Loads modules from files under a site root.
pub struct ScriptLoader {
    root: PathBuf,
    ext: String,
    registry: DashMap<String, Loaded>,
}

impl ScriptLoader {
    pub fn new(root: impl Into<PathBuf>, ext: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ext: ext.into(),
            registry: DashMap::new(),
        }
    }

    /// Number of currently loaded modules.
    pub fn loaded_count(&self) -> usize {
        self.registry.len()
    }

    fn compile(&self, reference: &str) -> Result<Loaded, LoadError> {
        let path = path_for(&self.root, reference, &self.ext);
        let source =
            std::fs::read_to_string(&path).map_err(|e| LoadError::Io(path.clone(), e))?;

        match source.lines().next().and_then(|l| l.strip_prefix("#!")) {
            Some(shebang) => {
                let handler = CgiHandler::from_shebang(reference, shebang, path)?;
                Ok(Loaded::Handler(Arc::new(handler)))
            }
            None => {
                let template = TextTemplate::parse(&source).map_err(|message| LoadError::Syntax {
                    reference: reference.to_string(),
                    message,
                })?;
                Ok(Loaded::Template(Arc::new(template)))
            }
        }
    }
}

impl ModuleLoader for ScriptLoader {
    fn load(&self, reference: &str) -> Result<Loaded, LoadError> {
        if let Some(loaded) = self.registry.get(reference) {
            return Ok(loaded.clone());
        }
        let loaded = self.compile(reference)?;
        crate::debug!("module"; "loaded {} `{}`", loaded.kind(), reference);
        self.registry.insert(reference.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn unload(&self, reference: &str) {
        if self.registry.remove(reference).is_some() {
            crate::debug!("module"; "unloaded `{}`", reference);
        }
    }
}

/// Handler that runs a script through its interpreter, CGI style.
struct CgiHandler {
    reference: String,
    interpreter: PathBuf,
    args: Vec<String>,
    script: PathBuf,
}

impl CgiHandler {
    /// Build from the text after `#!`. `/usr/bin/env NAME` looks NAME up on PATH.
    fn from_shebang(reference: &str, shebang: &str, script: PathBuf) -> Result<Self, LoadError> {
        let mut words = shebang.split_whitespace();
        let Some(program) = words.next() else {
            return Err(LoadError::Syntax {
                reference: reference.to_string(),
                message: "empty `#!` line".to_string(),
            });
        };

        let program = if Path::new(program).file_name().is_some_and(|n| n == "env") {
            words.next().unwrap_or(program)
        } else {
            program
        };

        let interpreter = which::which(program).map_err(|_| LoadError::Interpreter {
            reference: reference.to_string(),
            interpreter: program.to_string(),
        })?;

        Ok(Self {
            reference: reference.to_string(),
            interpreter,
            args: words.map(str::to_string).collect(),
            script,
        })
    }

    fn environment(&self, req: &Request) -> Vec<(String, String)> {
        let mut env = vec![
            ("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string()),
            ("REQUEST_METHOD".to_string(), req.method().as_str().to_string()),
            ("PATH_INFO".to_string(), req.path().to_string()),
            ("QUERY_STRING".to_string(), req.query_string().to_string()),
            ("SCRIPT_FILENAME".to_string(), self.script.display().to_string()),
            ("CONTENT_LENGTH".to_string(), req.body().len().to_string()),
        ];
        if let Some(content_type) = req.header("Content-Type") {
            env.push(("CONTENT_TYPE".to_string(), content_type.to_string()));
        }
        for (name, value) in req.headers() {
            let key = format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"));
            env.push((key, value.clone()));
        }
        env
    }
}

impl Handler for CgiHandler {
    fn call(&self, req: &mut Request) -> Result<Response> {
        let mut cmd = Cmd::new(&self.interpreter)
            .args(&self.args)
            .arg(&self.script)
            .envs(self.environment(req))
            .stdin(req.body());
        if let Some(dir) = self.script.parent() {
            cmd = cmd.cwd(dir);
        }

        let output = cmd.run()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                bail!("`{}` exited with {}", self.reference, output.status);
            }
            bail!("{stderr}");
        }

        Ok(parse_cgi_output(output.stdout))
    }
}

/// Split script output into an optional header block and a body.
///
/// The header block is recognized only when the first line is a
/// `Name: value` header and a blank line follows the block.
fn parse_cgi_output(stdout: Vec<u8>) -> Response {
    let Some((head, body_start)) = split_head(&stdout) else {
        return Response::bytes(types::HTML, stdout);
    };

    let mut response = Response::empty(crate::core::status::OK);
    let mut has_type = false;
    for line in head.lines() {
        let Some((name, value)) = line.split_once(':') else { continue };
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("Status") {
            if let Some(code) = value.split_whitespace().next().and_then(|c| c.parse().ok()) {
                response = response.with_status(code);
            }
            continue;
        }
        has_type |= name.eq_ignore_ascii_case("Content-Type");
        response = response.with_header(name, value);
    }
    if !has_type {
        response = response.with_header("Content-Type", types::HTML);
    }

    response.with_body(stdout[body_start..].to_vec())
}

fn split_head(stdout: &[u8]) -> Option<(&str, usize)> {
    let (end, sep) = [b"\r\n\r\n".as_slice(), b"\n\n".as_slice()]
        .iter()
        .filter_map(|sep| find(stdout, sep).map(|i| (i, sep.len())))
        .min_by_key(|(i, _)| *i)?;
    let head = std::str::from_utf8(&stdout[..end]).ok()?;
    let first = head.lines().next()?;
    is_header_line(first).then_some((head, end + sep))
}

fn is_header_line(line: &str) -> bool {
    line.split_once(':').is_some_and(|(name, _)| {
        !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
