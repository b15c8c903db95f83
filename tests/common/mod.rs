#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use taos_case_harness::manifest::ClientConfigSettings;
use tempfile::TempDir;

/// A workspace holding an `api/` project whose `make` is a shell script.
///
/// Every make target and every run of the built binary appends a line to `trace`.
pub struct FakeProject {
    pub dir: TempDir,
    pub trace: PathBuf,
    pub settings: ClientConfigSettings,
}

impl FakeProject {
    pub fn new(build_exit: i32, test_exit: i32) -> Self {
        let dir = tempfile::tempdir().expect("create workspace");
        let project = dir.path().join("api");
        fs::create_dir_all(&project).expect("create project dir");
        let trace = dir.path().join("trace.log");
        let make = dir.path().join("make.sh");
        fs::write(&make, make_script(&trace, build_exit, test_exit)).expect("write make.sh");

        let settings = ClientConfigSettings {
            project_dir: PathBuf::from("api"),
            make_program: "sh".into(),
            make_args: vec![make.display().to_string()],
            binary: "clientcfgtest".into(),
        };
        Self {
            dir,
            trace,
            settings,
        }
    }

    pub fn workspace(&self) -> &Path {
        self.dir.path()
    }

    pub fn trace_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.trace)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn make_script(trace: &Path, build_exit: i32, test_exit: i32) -> String {
    let trace = trace.display();
    format!(
        r#"target="${{1:-all}}"
echo "make $target" >> "{trace}"
if [ "$target" = "clean" ]; then
    rm -f clientcfgtest
    exit 0
fi
if [ {build_exit} -ne 0 ]; then
    echo "clientcfgtest.c: compile error" >&2
    exit {build_exit}
fi
cat > clientcfgtest <<'SCRIPT'
#!/bin/sh
echo run >> "{trace}"
echo "client config checked"
[ {test_exit} -ne 0 ] && echo "taosSetConfig mismatch" >&2
exit {test_exit}
SCRIPT
chmod +x clientcfgtest
"#
    )
}
