#![cfg(unix)]
mod test_support;

use std::sync::Arc;

use forensic_blackboard::{FileStatus, NewFileObject, ObjectStore};
use forensic_core::{FileAnalysisPipeline, FileInfo, FrameworkContext, Pipeline, Status, SystemProperties};
use test_support::{store, unique_fs_id};

// El pipeline registra módulos y estados en Postgres igual que en memoria.
#[test]
fn file_pipeline_records_status_in_postgres() {
    let Some(s) = store() else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let fs = unique_fs_id();
    let id = s.add_file_object(&NewFileObject { fs_obj_id: fs,
                                                meta_addr: 3,
                                                par_obj_id: None,
                                                name: "a.bin".into(),
                                                size: 1,
                                                is_dir: false })
              .unwrap();
    let ctx = Arc::new(FrameworkContext::new(SystemProperties::new(), Arc::new(s)));
    let mut p = FileAnalysisPipeline::new(Arc::clone(&ctx));
    p.initialize(r#"<PIPELINE type="FileAnalysis"><MODULE order="1" type="executable" location="/bin/sh" arguments="-c true"/></PIPELINE>"#)
     .unwrap();
    let report = p.run(&FileInfo::new(id, "/tmp/a.bin")).unwrap();
    assert_eq!(report.modules[0].status, Status::Ok);
    let module_id = p.modules()[0].module_id();
    assert_eq!(ctx.store().module_status(id, module_id).unwrap(), Some(0));
    assert_eq!(ctx.store().file_status(id).unwrap(), Some(FileStatus::AnalysisComplete));
}
