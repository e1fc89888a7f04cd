use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::Result;
use mcu_link_helper::two_stage::{LinkPass, LinkSummary};
use mcu_link_helper::usage::ImageKind;
use mcu_link_helper::{two_stage_link, LinkFailed, LinkOptions, LinkStatus, Toolchain};

const LAYOUT: &str = r#"
MEMORY
{
    flash (rx)  : ORIGIN = 0x08000000, LENGTH = 512K
    ram   (rwx) : ORIGIN = 0x20000000, LENGTH = 128K
}
"#;

// .text in flash; .data + .bss = 40000 bytes of RAM; .stack and .heap are
// reservations and must not count.
const REPORT: &str = "app.elf.step1  :
section             size        addr
.isr_vector          392   134217728
.text              19608   134218120
.data              30000   536870912
.bss               10000   536900912
.heap               8192   536910912
.stack              2048   536919104
.comment              69           0
Total              70309


";

/// Stand-in for the linker and size tool. Records every linker argument
/// vector, touches the `-o` file, and answers with queued exit codes.
struct FakeToolchain {
    calls: RefCell<Vec<Vec<String>>>,
    exit_codes: RefCell<VecDeque<i32>>,
    report: String,
    measured: RefCell<Option<PathBuf>>,
}

impl FakeToolchain {
    fn new(exit_codes: &[i32], report: &str) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            exit_codes: RefCell::new(exit_codes.iter().copied().collect()),
            report: report.to_string(),
            measured: RefCell::new(None),
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

fn output_arg(args: &[String]) -> &str {
    let idx = args.iter().position(|a| a == "-o").expect("-o in args");
    &args[idx + 1]
}

impl Toolchain for FakeToolchain {
    fn link(&self, args: &[String]) -> Result<LinkStatus> {
        self.calls.borrow_mut().push(args.to_vec());
        std::fs::write(output_arg(args), b"\x7fELF")?;
        let code = self.exit_codes.borrow_mut().pop_front().unwrap_or(0);
        Ok(LinkStatus { code: Some(code) })
    }

    fn section_report(&self, binary: &Path) -> Result<String> {
        assert!(binary.exists(), "size tool run on a missing image");
        *self.measured.borrow_mut() = Some(binary.to_path_buf());
        Ok(self.report.clone())
    }
}

struct Build {
    dir: tempfile::TempDir,
}

impl Build {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("layout.ld"), LAYOUT).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn args(&self, extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "main.o".to_string(),
            "-o".to_string(),
            self.path("app.elf"),
            "--gc-sections".to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        args
    }

    fn standard_args(&self) -> Vec<String> {
        let script = format!("--script={}", self.path("layout.ld"));
        self.args(&[
            script.as_str(),
            "--defsym=cmake_ram_size=128k",
            "--defsym=cmake_min_stack_size=2048",
            "--defsym=cmake_stack_size_extra=0",
            "--defsym=cmake_heap_size=8192",
        ])
    }

    fn provisional(&self) -> PathBuf {
        self.dir.path().join("app.elf.step1")
    }
}

fn run(toolchain: &FakeToolchain, args: Vec<String>) -> Result<LinkSummary> {
    two_stage_link(toolchain, args, &LinkOptions::default())
}

#[test]
fn both_passes_with_solved_stack() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 0], REPORT);

    let summary = run(&tc, build.standard_args()).unwrap();

    assert_eq!(summary.budget.used_ram, 40000);
    assert_eq!(summary.budget.reserve(), 512);
    assert_eq!(summary.extra_stack, 80320);
    assert_eq!(summary.image, Some(ImageKind::Flash));
    assert_eq!(summary.usage[0].used, 392 + 19608);

    let calls = tc.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(output_arg(&calls[0]), build.provisional().to_string_lossy());
    assert!(calls[0].contains(&"--defsym=cmake_stack_size_extra=0".to_string()));
    assert_eq!(output_arg(&calls[1]), build.path("app.elf"));
    assert!(calls[1].contains(&"--defsym=cmake_stack_size_extra=80320".to_string()));
    // everything else goes through untouched
    assert_eq!(calls[1].len(), build.standard_args().len());
    assert!(calls[1].contains(&"--gc-sections".to_string()));

    assert_eq!(tc.measured.borrow().as_deref(), Some(build.provisional().as_path()));
    assert!(!build.provisional().exists());
    assert!(Path::new(&build.path("app.elf")).exists());
}

#[test]
fn first_pass_failure_stops_and_cleans_up() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[3], REPORT);

    let err = run(&tc, build.standard_args()).unwrap_err();
    let failed = err.downcast_ref::<LinkFailed>().expect("LinkFailed");
    assert_eq!(failed.pass, LinkPass::Provisional);
    assert_eq!(failed.exit_code(), 3);

    assert_eq!(tc.calls().len(), 1);
    assert!(tc.measured.borrow().is_none());
    assert!(!build.provisional().exists());
}

#[test]
fn second_pass_failure_still_cleans_up() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 1], REPORT);

    let err = run(&tc, build.standard_args()).unwrap_err();
    let failed = err.downcast_ref::<LinkFailed>().expect("LinkFailed");
    assert_eq!(failed.pass, LinkPass::Final);
    assert_eq!(tc.calls().len(), 2);
    assert!(!build.provisional().exists());
}

#[test]
fn unreadable_report_is_fatal_and_cleans_up() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 0], "   text    data     bss     dec     hex filename\n");

    let err = run(&tc, build.standard_args()).unwrap_err();
    assert!(err.downcast_ref::<LinkFailed>().is_none());
    assert_eq!(tc.calls().len(), 1);
    assert!(!build.provisional().exists());
}

#[test]
fn missing_layout_degrades_to_zero_usage() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 0], REPORT);
    let args = build.args(&[
        "--defsym=cmake_ram_size=128k",
        "--defsym=cmake_min_stack_size=2048",
        "--defsym=cmake_stack_size_extra=0",
        "--defsym=cmake_heap_size=8192",
    ]);

    let summary = run(&tc, args).unwrap();
    assert_eq!(summary.budget.used_ram, 0);
    assert_eq!(summary.extra_stack, 131072 - (2048 + 8192 + 512));
    assert_eq!(summary.image, None);
    assert!(summary.usage.is_empty());
}

#[test]
fn strict_layout_refuses_before_linking() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 0], REPORT);
    let args = build.args(&["-T", "does-not-exist.ld", "--defsym=cmake_stack_size_extra=0", "--defsym=cmake_ram_size=4096"]);

    let options = LinkOptions { strict_layout: true };
    assert!(two_stage_link(&tc, args, &options).is_err());
    assert!(tc.calls().is_empty());
}

#[test]
fn ram_size_from_layout_when_not_passed() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 0], REPORT);
    let script = format!("-T{}", build.path("layout.ld"));
    let args = build.args(&[script.as_str(), "--defsym=cmake_stack_size_extra=0"]);

    let summary = run(&tc, args).unwrap();
    assert_eq!(summary.budget.ram_size, 128 * 1024);
    assert_eq!(summary.budget.min_stack_size, 0);
    assert_eq!(summary.budget.heap_size, 0);
    assert_eq!(summary.extra_stack, 131072 - (40000 + 512));
}

#[test]
fn overcommitted_ram_is_passed_through() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 1], REPORT);
    let script = format!("--script={}", build.path("layout.ld"));
    let args = build.args(&[
        script.as_str(),
        "--defsym=cmake_ram_size=32k",
        "--defsym=cmake_stack_size_extra=0",
    ]);

    // the linker, not the driver, rejects the image
    let err = run(&tc, args).unwrap_err();
    assert_eq!(err.downcast_ref::<LinkFailed>().map(|f| f.pass), Some(LinkPass::Final));
    let expected = 32768 - (40000 + 128);
    assert!(tc.calls()[1].contains(&format!("--defsym=cmake_stack_size_extra={}", expected)));
}

#[test]
fn missing_required_arguments() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 0], REPORT);

    let no_output = vec!["main.o".to_string(), "--defsym=cmake_stack_size_extra=0".to_string()];
    assert!(run(&tc, no_output).is_err());

    let no_slot = build.args(&["--defsym=cmake_ram_size=128k"]);
    assert!(run(&tc, no_slot).is_err());

    // no RAM size anywhere
    let no_ram = build.args(&["--defsym=cmake_stack_size_extra=0"]);
    assert!(run(&tc, no_ram).is_err());

    assert!(tc.calls().is_empty());
}

#[test]
fn script_passed_through_compiler_driver() {
    let build = Build::new();
    let tc = FakeToolchain::new(&[0, 0], REPORT);
    let script = format!("-Wl,--gc-sections,-T,{}", build.path("layout.ld"));
    let args = build.args(&[
        script.as_str(),
        "-Wl,--defsym=cmake_ram_size=128k",
        "-Wl,--defsym=cmake_stack_size_extra=0",
    ]);

    let summary = run(&tc, args).unwrap();
    assert_eq!(summary.budget.used_ram, 40000);
    assert_eq!(summary.extra_stack, 131072 - (40000 + 512));
    assert!(tc.calls()[1].contains(&"-Wl,--defsym=cmake_stack_size_extra=90560".to_string()));
}
