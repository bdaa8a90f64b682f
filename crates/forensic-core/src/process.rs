//! Lanzamiento de programas externos.
//!
//! `run` bloquea hasta que el hijo termina. El exit code se devuelve como
//! valor (distinto de cero no es error); `RunError` sólo cubre fallos al
//! lanzar, al preparar la salida o al capturar el stdout.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;

use crate::errors::RunError;

const DRAIN_BUFFER_SIZE: usize = 8 * 1024;

/// Copia todo `source` a `sink` con un buffer acotado. Termina exactamente
/// cuando una lectura devuelve 0 (el productor cerró su extremo); las
/// lecturas parciales siguen el loop. Devuelve los bytes copiados.
pub fn drain_to_sink<R: Read + ?Sized, W: Write + ?Sized>(source: &mut R, sink: &mut W) -> io::Result<u64> {
    let mut buf = [0u8; DRAIN_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.write_all(&buf[..n])?;
        total += n as u64;
    }
    sink.flush()?;
    Ok(total)
}

/// Ejecuta `program` con `args`. Si `output` está presente, el stdout del
/// hijo se agrega al final de ese archivo (creando directorios y archivo si
/// faltan); si no, el hijo hereda la entrada/salida del proceso actual.
pub fn run(program: &Path, args: &[String], output: Option<&Path>) -> Result<i32, RunError> {
    let mut cmd = Command::new(program);
    cmd.args(args);

    let Some(output) = output.filter(|p| !p.as_os_str().is_empty()) else {
        debug!("launching {} {:?}", program.display(), args);
        let status = cmd.status()
                        .map_err(|source| RunError::Spawn { program: program.to_path_buf(), source })?;
        return Ok(exit_code(status));
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RunError::CreateDir { path: parent.to_path_buf(), source })?;
    }
    let mut sink = OpenOptions::new().create(true)
                                     .append(true)
                                     .open(output)
                                     .map_err(|source| RunError::OpenOutput { path: output.to_path_buf(), source })?;

    debug!("launching {} {:?} > {}", program.display(), args, output.display());
    let mut child = cmd.stdout(Stdio::piped())
                       .spawn()
                       .map_err(|source| RunError::Spawn { program: program.to_path_buf(), source })?;

    let copied = match child.stdout.take() {
        Some(mut stdout) => drain_to_sink(&mut stdout, &mut sink),
        None => Ok(0),
    };
    // Siempre se espera al hijo, incluso si la copia falló, para no dejar
    // zombies.
    let status = child.wait()
                      .map_err(|source| RunError::Wait { program: program.to_path_buf(), source })?;
    let copied = copied.map_err(|source| RunError::Capture { program: program.to_path_buf(), source })?;
    debug!("{} wrote {copied} bytes to {}", program.display(), output.display());
    Ok(exit_code(status))
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Divide un string de argumentos en blancos. No hay soporte de comillas.
pub fn split_arguments(arguments: &str) -> Vec<String> { arguments.split_whitespace().map(str::to_string).collect() }

#[cfg(test)]
mod tests {
    use super::*;

    /// Lector que entrega de a pocos bytes e intercala interrupciones.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        calls: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 3 == 0 {
                return Err(io::Error::new(ErrorKind::Interrupted, "again"));
            }
            let n = (self.data.len() - self.pos).min(7).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn drain_loops_over_partial_reads() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut src = Trickle { data: data.clone(), pos: 0, calls: 0 };
        let mut sink = Vec::new();
        let n = drain_to_sink(&mut src, &mut sink).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(sink, data);
    }

    #[test]
    fn drain_of_empty_source() {
        let mut src: &[u8] = &[];
        let mut sink = Vec::new();
        assert_eq!(drain_to_sink(&mut src, &mut sink).unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn naive_whitespace_split() {
        assert_eq!(split_arguments("  -a  b\t\"c d\" "), vec!["-a", "b", "\"c", "d\""]);
        assert!(split_arguments("").is_empty());
    }
}
