//! End-to-end analysis of inline IR fixtures.

use regscan::{
    AccessType, AnalysisConfig, AnalysisSession, ExecutionPhase, PeripheralCatalog, RegisterValue,
    parse_module,
};
use regscan_analysis::{UNKNOWN_PERIPHERAL, priority_of};

const BOARD_MPU: &str = r#"
source_filename = "board.c"

declare void @XCACHE_DisableCache(i32 noundef)
declare void @XCACHE_EnableCache(i32 noundef)
declare void @ARM_MPU_Disable()
declare void @ARM_MPU_SetRegion(i32 noundef, i32 noundef, i32 noundef)
declare void @ARM_MPU_Enable(i32 noundef)

define void @BOARD_ConfigMPU() !dbg !10 {
  call void @XCACHE_DisableCache(i32 noundef 0), !dbg !20
  call void @XCACHE_DisableCache(i32 noundef 1), !dbg !21
  call void @ARM_MPU_Disable(), !dbg !22
  call void @ARM_MPU_SetRegion(i32 noundef 0, i32 noundef 536870912, i32 noundef 536936449), !dbg !23
  call void @ARM_MPU_Enable(i32 noundef 6), !dbg !24
  call void @XCACHE_EnableCache(i32 noundef 0), !dbg !25
  call void @XCACHE_EnableCache(i32 noundef 1), !dbg !26
  ret void
}

define i32 @main() {
  call void @BOARD_ConfigMPU()
  ret i32 0
}

!10 = distinct !DISubprogram(name: "BOARD_ConfigMPU", scope: !11, file: !11, line: 100)
!11 = !DIFile(filename: "board.c", directory: "/sdk/boards")
!20 = !DILocation(line: 102, column: 5, scope: !10)
!21 = !DILocation(line: 103, column: 5, scope: !10)
!22 = !DILocation(line: 105, column: 5, scope: !10)
!23 = !DILocation(line: 106, column: 5, scope: !10)
!24 = !DILocation(line: 107, column: 5, scope: !10)
!25 = !DILocation(line: 109, column: 5, scope: !10)
!26 = !DILocation(line: 110, column: 5, scope: !10)
"#;

const TWO_PATHS: &str = r"
define internal void @led_on() {
  store volatile i32 1, ptr inttoptr (i32 1074790404 to ptr), align 4
  ret void
}

define void @task_a() {
  call void @led_on()
  ret void
}

define void @task_b() {
  call void @led_on()
  ret void
}

define void @GPIO_Poke(ptr noundef %0) {
  store volatile i32 2, ptr %0, align 4
  store i32 3, ptr null, align 4
  ret void
}

define i32 @main() {
  call void @task_a()
  call void @task_b()
  call void @led_on()
  call void @GPIO_Poke(ptr noundef null)
  ret i32 0
}
";

const FAR_MEMBERS: &str = r"
%struct.XSPI_Type = type { [4 x i32] }

define void @XSPI_SetupFar() {
  store volatile i32 1, ptr getelementptr inbounds (%struct.XSPI_Type, ptr inttoptr (i32 1078005760 to ptr), i32 0, i32 0, i32 2000), align 4
  store volatile i32 1, ptr getelementptr inbounds (%struct.XSPI_Type, ptr inttoptr (i32 1078005760 to ptr), i32 0, i32 0, i32 3), align 4
  ret void
}

define i32 @main() {
  call void @XSPI_SetupFar()
  ret i32 0
}
";

const INLINE_HELPER: &str = r"
define internal void @GPIO_PinWrite(ptr noundef %0, i32 noundef %1, i32 noundef %2) {
  store volatile i32 8, ptr inttoptr (i32 1074790404 to ptr), align 4
  ret void
}

define i32 @main() {
  call void @GPIO_PinWrite(ptr noundef inttoptr (i32 1074790400 to ptr), i32 noundef 3, i32 noundef 1)
  ret i32 0
}
";

fn analyze(text: &str) -> AnalysisSession {
    let module = parse_module(text, "fixture.ll").unwrap();
    let mut session = AnalysisSession::with_builtin_catalog(AnalysisConfig::default());
    session.analyze_module(&module);
    session
}

fn assert_record_invariants(session: &AnalysisSession) {
    let catalog = PeripheralCatalog::mimxrt700();
    for a in session.accesses() {
        assert!(matches!(a.data_size, 8 | 16 | 32), "{a:?}");
        assert!(!a.bits_modified.is_empty(), "{a:?}");
        if a.peripheral != UNKNOWN_PERIPHERAL {
            // Exact register or inside [base, base + 0x1000)
            assert!(catalog.owns_address(&a.peripheral, a.address), "{a:?}");
        }
    }
}

#[test]
fn mpu_and_cache_configuration() {
    let session = analyze(BOARD_MPU);
    let accesses = session.accesses();
    assert_eq!(accesses.len(), 7);
    assert_record_invariants(&session);

    let xcache: Vec<(&str, u64)> = accesses
        .iter()
        .filter(|a| a.purpose == "Cache disable")
        .map(|a| (a.peripheral.as_str(), a.address))
        .collect();
    assert_eq!(xcache, vec![("XCACHE0", 0x4018_0000), ("XCACHE1", 0x4019_0000)]);

    let enable = accesses
        .iter()
        .find(|a| a.register == "CTRL" && a.purpose == "MPU enable")
        .unwrap();
    assert_eq!(enable.peripheral, "MPU");
    assert_eq!(enable.access_type, AccessType::FunctionCallWrite);
    assert_eq!(enable.value_written, Some(RegisterValue::Known(0x7)));
    for bit in ["ENABLE", "HFNMIENA", "PRIVDEFENA"] {
        assert!(enable.bits_modified.iter().any(|b| b == bit));
    }
    assert_eq!(enable.location.file, "board.c");
    assert_eq!(enable.location.line, 107);
    assert_eq!(enable.order.execution_phase, ExecutionPhase::BoardInit);
    assert_eq!(enable.order.execution_context, "mpu_configuration");
    assert_eq!(enable.order.basic_block_id, "BOARD_ConfigMPU_BB_0");
    assert_eq!(enable.order.instruction_index, 4);

    // Sequence numbers come from the callee priorities
    let chrono = session.chronological_accesses();
    for a in &chrono {
        let callee = match a.purpose.as_str() {
            "Cache disable" => "XCACHE_DisableCache",
            "Cache enable" => "XCACHE_EnableCache",
            "MPU disable" => "ARM_MPU_Disable",
            "MPU region configuration" => "ARM_MPU_SetRegion",
            "MPU enable" => "ARM_MPU_Enable",
            other => panic!("unexpected purpose {other}"),
        };
        assert_eq!(Some(a.order.sequence_number), priority_of(callee));
    }
    assert!(chrono.windows(2).all(|w| w[0].order.sequence_number <= w[1].order.sequence_number));

    // Equal sequence numbers keep discovery order
    let disables: Vec<&str> = chrono
        .iter()
        .filter(|a| a.purpose == "Cache disable")
        .map(|a| a.peripheral.as_str())
        .collect();
    assert_eq!(disables, vec!["XCACHE0", "XCACHE1"]);
}

#[test]
fn shared_callee_is_counted_once() {
    let session = analyze(TWO_PATHS);
    let led: Vec<_> = session
        .accesses()
        .iter()
        .filter(|a| a.location.function == "led_on")
        .collect();
    assert_eq!(led.len(), 1);
    assert_eq!(led[0].register, "PSOR");
    assert_eq!(led[0].order.call_stack, "led_on");
    assert_record_invariants(&session);
}

#[test]
fn address_zero_accesses() {
    let session = analyze(TWO_PATHS);
    let poke: Vec<_> = session
        .accesses()
        .iter()
        .filter(|a| a.location.function == "GPIO_Poke")
        .collect();
    // Only the volatile store is inferred; the plain one is dropped
    assert_eq!(poke.len(), 1);
    assert_eq!(poke[0].peripheral, "GPIO0");
    assert_eq!(poke[0].address, 0x4010_0000);
    assert_eq!(poke[0].access_type, AccessType::VolatileWrite);
}

#[test]
fn chronological_is_stable_permutation() {
    let session = analyze(BOARD_MPU);
    let chrono = session.chronological_accesses();
    assert_eq!(chrono.len(), session.accesses().len());
    for a in session.accesses() {
        assert_eq!(
            chrono.iter().filter(|c| ***c == *a).count(),
            session.accesses().iter().filter(|r| *r == a).count()
        );
    }
}

#[test]
fn exports_are_idempotent() {
    let session = analyze(BOARD_MPU);
    let grouped = regscan::grouped_json(&session).unwrap();
    assert_eq!(grouped, regscan::grouped_json(&session).unwrap());
    let chrono = regscan::chronological_json(&session).unwrap();
    assert_eq!(chrono, regscan::chronological_json(&session).unwrap());

    let json: serde_json::Value = serde_json::from_str(&chrono).unwrap();
    assert_eq!(json["total_accesses"], 7);
    assert_eq!(json["execution_phase_summary"]["board_init"], 7);
    assert_eq!(json["execution_phase_summary"]["runtime"], 0);
}

#[test]
fn sessions_accumulate_across_modules() {
    let first = parse_module(BOARD_MPU, "board.ll").unwrap();
    let second = parse_module(TWO_PATHS, "app.ll").unwrap();
    let mut session = AnalysisSession::with_builtin_catalog(AnalysisConfig::default());
    let a = session.analyze_module(&first);
    // `main` was already walked in the first module
    let b = session.analyze_module(&second);
    assert_eq!((a, b), (7, 0));

    session.reset();
    assert_eq!(session.analyze_module(&second), 2);
}

#[test]
fn records_stay_inside_peripheral_windows() {
    for fixture in [BOARD_MPU, TWO_PATHS, FAR_MEMBERS, INLINE_HELPER] {
        assert_record_invariants(&analyze(fixture));
    }

    let session = analyze(FAR_MEMBERS);
    let named: Vec<(&str, &str, u64)> = session
        .accesses()
        .iter()
        .map(|a| (a.peripheral.as_str(), a.register.as_str(), a.address))
        .collect();
    // Member 2000 lands past the XSPI2 window and is dropped
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].0, "XSPI2");
    assert_eq!(named[0].2, 0x4041_100C);
}

#[test]
fn recognized_helper_body_is_walked() {
    let session = analyze(INLINE_HELPER);
    let accesses = session.accesses();
    assert_eq!(accesses.len(), 2);

    assert_eq!(accesses[0].access_type, AccessType::FunctionCallWrite);
    assert_eq!(accesses[0].register, "PDOR");
    assert_eq!(accesses[0].location.function, "main");

    assert_eq!(accesses[1].access_type, AccessType::VolatileWrite);
    assert_eq!((accesses[1].peripheral.as_str(), accesses[1].register.as_str()), ("GPIO0", "PSOR"));
    assert_eq!(accesses[1].location.function, "GPIO_PinWrite");
    assert_eq!(accesses[1].value_written, Some(RegisterValue::Known(8)));

    let module = parse_module(INLINE_HELPER, "fixture.ll").unwrap();
    let mut summarized =
        AnalysisSession::with_builtin_catalog(AnalysisConfig::default().with_known_call_descent(false));
    assert_eq!(summarized.analyze_module(&module), 1);
}
