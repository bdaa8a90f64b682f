//! Sustitución de macros `@NOMBRE` en argumentos y rutas de salida.
//!
//! Una sola pasada de izquierda a derecha: en cada `@` se elige la macro
//! conocida más larga que empieza ahí; el texto de reemplazo no se vuelve a
//! escanear. Tokens desconocidos quedan tal cual. Las macros de archivo
//! (`@FILE`, `@FILE_NAME`, `@FILE_ID`) quedan literales si no hay archivo.

use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::{PredefinedProperty, SystemProperties};
use crate::constants::TIME_FORMAT;
use crate::file::FileInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Macro {
    File,
    FileName,
    FileId,
    Out,
    Session,
    ProgDir,
    ModDir,
    Task,
    Node,
    Sequence,
    Pid,
    StartTime,
    CurTime,
    UniqueId,
}

const MACROS: [(&str, Macro); 14] = [("@FILE", Macro::File),
                                     ("@FILE_NAME", Macro::FileName),
                                     ("@FILE_ID", Macro::FileId),
                                     ("@OUT", Macro::Out),
                                     ("@SESSION", Macro::Session),
                                     ("@PROGDIR", Macro::ProgDir),
                                     ("@MODDIR", Macro::ModDir),
                                     ("@TASK", Macro::Task),
                                     ("@NODE", Macro::Node),
                                     ("@SEQUENCE", Macro::Sequence),
                                     ("@PID", Macro::Pid),
                                     ("@STARTTIME", Macro::StartTime),
                                     ("@CURTIME", Macro::CurTime),
                                     ("@UNIQUE_ID", Macro::UniqueId)];

#[derive(Debug, Clone)]
pub struct ParameterSubstitutor {
    props: Arc<SystemProperties>,
}

impl ParameterSubstitutor {
    pub fn new(props: Arc<SystemProperties>) -> Self { Self { props } }

    pub fn properties(&self) -> &Arc<SystemProperties> { &self.props }

    pub fn substitute(&self, template: &str, file: Option<&FileInfo>) -> String {
        self.substitute_at(template, file, Local::now())
    }

    /// Variante determinista: `@CURTIME` usa `now`.
    pub fn substitute_at(&self, template: &str, file: Option<&FileInfo>, now: DateTime<Local>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(at) = rest.find('@') {
            out.push_str(&rest[..at]);
            let candidate = &rest[at..];
            let hit = MACROS.iter()
                            .filter(|(token, _)| candidate.starts_with(token))
                            .max_by_key(|(token, _)| token.len());
            match hit {
                Some((token, m)) => {
                    match self.resolve(*m, file, now) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(token),
                    }
                    rest = &candidate[token.len()..];
                }
                None => {
                    out.push('@');
                    rest = &candidate[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn resolve(&self, m: Macro, file: Option<&FileInfo>, now: DateTime<Local>) -> Option<String> {
        let prop = |p: PredefinedProperty| Some(self.props.get_predefined(p));
        match m {
            Macro::File => file.map(|f| f.path.display().to_string()),
            Macro::FileName => file.map(|f| f.name.clone()),
            Macro::FileId => file.map(|f| f.id.to_string()),
            Macro::Out => prop(PredefinedProperty::OutDir),
            Macro::Session => prop(PredefinedProperty::SessionId),
            Macro::ProgDir => prop(PredefinedProperty::ProgDir),
            Macro::ModDir => prop(PredefinedProperty::ModuleDir),
            Macro::Task => prop(PredefinedProperty::CurrentTask),
            Macro::Node => prop(PredefinedProperty::Node),
            Macro::Sequence => prop(PredefinedProperty::CurrentSequenceNumber),
            Macro::Pid => prop(PredefinedProperty::Pid),
            Macro::StartTime => prop(PredefinedProperty::StartTime),
            Macro::CurTime => Some(now.format(TIME_FORMAT).to_string()),
            Macro::UniqueId => prop(PredefinedProperty::UniqueId),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subst() -> ParameterSubstitutor {
        let mut p = SystemProperties::new();
        p.set_predefined(PredefinedProperty::OutDir, "/out");
        p.set_predefined(PredefinedProperty::SessionId, "s1");
        p.set_predefined(PredefinedProperty::ModuleDir, "#OUT_DIR#/modules");
        p.set_predefined(PredefinedProperty::Pid, "99");
        ParameterSubstitutor::new(Arc::new(p))
    }

    fn file() -> FileInfo { FileInfo::new(17, "/img/root/docs/report.pdf") }

    #[test]
    fn file_and_property_macros() {
        let s = subst();
        let f = file();
        assert_eq!(s.substitute("-i @FILE -o @OUT/@FILE_ID_@FILE_NAME", Some(&f)),
                   "-i /img/root/docs/report.pdf -o /out/17_report.pdf");
        assert_eq!(s.substitute("@MODDIR/x --session=@SESSION --pid @PID", None),
                   "/out/modules/x --session=s1 --pid 99");
    }

    #[test]
    fn unknown_tokens_and_missing_file_stay_verbatim() {
        let s = subst();
        assert_eq!(s.substitute("user@host @NOPE @FILE", None), "user@host @NOPE @FILE");
        assert_eq!(s.substitute("@@OUT", None), "@/out");
        assert_eq!(s.substitute("trailing @", None), "trailing @");
    }

    #[test]
    fn replacement_is_not_rescanned() {
        let mut f = file();
        f.path = "/data/@OUT".into();
        assert_eq!(subst().substitute("@FILE", Some(&f)), "/data/@OUT");
    }

    #[test]
    fn same_inputs_same_output() {
        let s = subst();
        let f = file();
        let now = Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let t = "@CURTIME @FILE @UNIQUE_ID @TASK";
        let first = s.substitute_at(t, Some(&f), now);
        assert_eq!(first, s.substitute_at(t, Some(&f), now));
        assert!(first.starts_with("2024_05_06_07_08_09 /img/root/docs/report.pdf "));
    }
}
