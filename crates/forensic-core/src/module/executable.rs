//! Módulo que ejecuta un programa externo por archivo.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use super::{Module, Status};
use crate::config::{PredefinedProperty, SystemProperties};
use crate::errors::{CoreError, RunError};
use crate::file::FileInfo;
use crate::process;
use crate::substitution::ParameterSubstitutor;

/// Programas que reciben el script a correr como primer argumento.
const INTERPRETERS: &[&str] = &["sh", "bash", "dash", "zsh", "ksh", "env", "perl", "python", "python3", "ruby", "node"];

pub struct ExecutableModule {
    name: String,
    path: PathBuf,
    arguments: String,
    output: String,
    module_id: i32,
    substitutor: ParameterSubstitutor,
}

impl ExecutableModule {
    pub fn new(props: Arc<SystemProperties>) -> Self {
        Self { name: String::new(),
               path: PathBuf::new(),
               arguments: String::new(),
               output: String::new(),
               module_id: 0,
               substitutor: ParameterSubstitutor::new(props) }
    }

    /// Resuelve y valida la ubicación del ejecutable. El nombre del módulo
    /// pasa a ser el nombre base del archivo, o el del script si el programa
    /// es un intérprete.
    pub fn set_path(&mut self, location: &str) -> Result<(), CoreError> {
        let path = resolve_location(location, self.substitutor.properties(), true)?;
        debug!("module {} -> {}", location, path.display());
        self.path = path;
        self.refresh_name();
        Ok(())
    }

    pub fn set_arguments(&mut self, arguments: impl Into<String>) {
        self.arguments = arguments.into();
        self.refresh_name();
    }

    fn refresh_name(&mut self) {
        let program = stem(&self.path);
        let script = INTERPRETERS.contains(&program.as_str())
                                 .then(|| self.arguments.split_whitespace().find(|t| !t.starts_with('-')))
                                 .flatten()
                                 .map(|t| stem(Path::new(t)))
                                 .filter(|s| !s.is_empty());
        self.name = script.unwrap_or(program);
    }

    /// Plantilla de la ruta de salida; vacía = el hijo hereda stdout.
    pub fn set_output(&mut self, location: impl Into<String>) { self.output = location.into(); }

    pub fn output(&self) -> &str { &self.output }

    /// Ejecuta el programa y devuelve su exit code.
    pub fn execute(&self, file: Option<&FileInfo>) -> Result<i32, RunError> {
        let args = process::split_arguments(&self.substitutor.substitute(&self.arguments, file));
        let output = if self.output.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(self.substitutor.substitute(self.output.trim(), file)))
        };
        process::run(&self.path, &args, output.as_deref())
    }

    fn execute_and_classify(&self, file: Option<&FileInfo>) -> Result<Status, CoreError> {
        let code = self.execute(file)?;
        if code != 0 {
            warn!("Module ({}) failed with exit code: {code}", self.path.display());
        }
        Ok(Status::Ok)
    }
}

impl Module for ExecutableModule {
    fn name(&self) -> &str { &self.name }

    fn path(&self) -> &Path { &self.path }

    fn arguments(&self) -> &str { &self.arguments }

    fn registry_key(&self) -> String {
        let args = self.arguments.split_whitespace().collect::<Vec<_>>().join(" ");
        if args.is_empty() {
            format!("{} ({})", self.name, self.path.display())
        } else {
            format!("{} ({} {args})", self.name, self.path.display())
        }
    }

    fn module_id(&self) -> i32 { self.module_id }

    fn set_module_id(&mut self, id: i32) { self.module_id = id; }

    fn run(&self, file: &FileInfo) -> Result<Status, CoreError> {
        if file.path.as_os_str().is_empty() {
            return Err(CoreError::InvalidArgument(format!("file {} has no path", file.id)));
        }
        self.execute_and_classify(Some(file))
    }

    fn report(&self) -> Result<Status, CoreError> { self.execute_and_classify(None) }
}

/// Busca `location`. Las rutas absolutas se usan tal cual; las relativas se
/// buscan en PROG_DIR, MODULE_DIR, el directorio actual y por último el PATH.
pub fn resolve_location(location: &str, props: &SystemProperties, require_executable: bool) -> Result<PathBuf, CoreError> {
    let location = props.expand(location.trim());
    if location.is_empty() {
        return Err(CoreError::config("module location is empty or missing"));
    }
    let requested = PathBuf::from(&location);

    let usable = |candidate: &Path| if require_executable { is_executable(candidate) } else { candidate.exists() };
    let found = if requested.is_absolute() {
        requested.exists().then(|| requested.clone())
    } else {
        let mut dirs: Vec<PathBuf> = [PredefinedProperty::ProgDir, PredefinedProperty::ModuleDir].into_iter()
                                                                                                  .filter_map(|p| props.dir(p))
                                                                                                  .collect();
        dirs.push(PathBuf::from("."));
        dirs.into_iter()
            .map(|d| d.join(&requested))
            .find(|candidate| usable(candidate.as_path()))
            .or_else(|| which::which(&requested).ok())
    };

    let path = found.ok_or_else(|| CoreError::config(format!("module location not found: {location}")))?;
    if require_executable && !is_executable(&path) {
        return Err(CoreError::config(format!("module location is not an executable file: {}", path.display())));
    }
    Ok(path)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn props_with(dir: &Path) -> Arc<SystemProperties> {
        let mut p = SystemProperties::new();
        p.set_predefined(PredefinedProperty::ModuleDir, dir.display().to_string());
        p.set_predefined(PredefinedProperty::OutDir, dir.join("out").display().to_string());
        Arc::new(p)
    }

    #[test]
    fn empty_location_is_configuration_error() {
        let mut m = ExecutableModule::new(Arc::new(SystemProperties::new()));
        assert!(matches!(m.set_path("  "), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn non_executable_file_is_rejected_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("plain.txt");
        fs::write(&script, "echo hi\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();
        let mut m = ExecutableModule::new(props_with(dir.path()));
        let err = m.set_path(script.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)), "{err}");
        assert!(matches!(m.set_path(dir.path().to_str().unwrap()), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn relative_location_is_found_in_module_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("hasher.sh");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let mut m = ExecutableModule::new(props_with(dir.path()));
        m.set_path("hasher.sh").unwrap();
        assert_eq!(m.path(), tool.as_path());
        assert_eq!(m.name(), "hasher");
    }

    #[test]
    fn interpreted_modules_are_named_after_their_script() {
        let mut m = ExecutableModule::new(Arc::new(SystemProperties::new()));
        m.set_path("/bin/sh").unwrap();
        assert_eq!(m.name(), "sh");
        m.set_arguments("-e @MODDIR/carve.sh @FILE");
        assert_eq!(m.name(), "carve");
        assert!(m.registry_key().starts_with("carve (/bin/sh -e @MODDIR/carve.sh @FILE"));
    }

    #[test]
    fn non_executable_candidates_do_not_shadow_path_lookup() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sh")).unwrap();
        let mut m = ExecutableModule::new(props_with(dir.path()));
        m.set_path("sh").unwrap();
        assert_ne!(m.path(), dir.path().join("sh").as_path());
        assert!(m.path().is_file());
    }

    #[test]
    fn bare_program_names_fall_back_to_path() {
        let mut m = ExecutableModule::new(Arc::new(SystemProperties::new()));
        m.set_path("sh").unwrap();
        assert!(m.path().is_absolute());
        assert!(matches!(m.set_path("surely-not-a-real-program-xyz"), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn output_template_is_expanded_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("emit.sh");
        fs::write(&script, "printf '%s' \"$1\"\n").unwrap();
        let mut m = ExecutableModule::new(props_with(dir.path()));
        m.set_path("/bin/sh").unwrap();
        m.set_arguments(format!("{} @FILE_NAME", script.display()));
        m.set_output("@OUT/@FILE_ID/name.txt");
        let f = FileInfo::new(5, dir.path().join("evidence.bin"));
        assert_eq!(m.run(&f).unwrap(), Status::Ok);
        let written = fs::read_to_string(dir.path().join("out/5/name.txt")).unwrap();
        assert_eq!(written, "evidence.bin");
    }

    #[test]
    fn launch_failure_is_an_error_not_a_status() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("vanishing.sh");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let mut m = ExecutableModule::new(props_with(dir.path()));
        m.set_path(tool.to_str().unwrap()).unwrap();
        fs::remove_file(&tool).unwrap();
        let err = m.run(&FileInfo::new(1, "/x")).unwrap_err();
        assert!(matches!(err, CoreError::Launch(RunError::Spawn { .. })));
    }
}
