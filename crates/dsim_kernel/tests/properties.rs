//! Randomized checks of the scheduler's ordering guarantees.
//!
//! Every test draws its designs and stimulus from a seeded `StdRng`, so a
//! failure always reproduces with the seed printed in the assertion.

use dsim_common::{LogicVec, SimTime};
use dsim_config::load_config;
use dsim_kernel::resolve::{resolve, Driver};
use dsim_kernel::{
    Activity, ActivityLog, Delay, Design, DriveStrength, DriverId, ProcessDecl, ProcessId,
    Resolution, RunStatus, SignalDecl, SimError, SimKernel, StepResult, Transaction,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const NS: u64 = 1_000_000;
const SEEDS: [u64; 6] = [1, 7, 42, 1_234, 99_991, 0xDEAD_BEEF];

// ---------------------------------------------------------------------------
// Single-driver value tracking
// ---------------------------------------------------------------------------

/// One posted assignment: `true` for fast, `false` for delta offset zero.
type Op = (bool, u64);

#[test]
fn single_driver_value_follows_last_transaction() {
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let steps: Vec<Vec<Op>> = (0..40)
            .map(|_| {
                let n = rng.gen_range(0..4);
                (0..n)
                    .map(|_| (rng.gen_bool(0.4), rng.gen_range(0..16)))
                    .collect()
            })
            .collect();

        // Expected value after each slot.
        let mut expected = BTreeMap::new();
        let mut value = 0u64;
        for (i, ops) in steps.iter().enumerate() {
            let t = i as u64 * NS;
            let last_fast = ops.iter().rev().find(|(fast, _)| *fast).map(|(_, v)| *v);
            let last_delta = ops.iter().rev().find(|(fast, _)| !*fast).map(|(_, v)| *v);
            match (last_fast, last_delta) {
                (Some(v), _) => {
                    value = v;
                    expected.insert(SimTime::at_delta(t, 0), value);
                }
                (None, Some(v)) => {
                    expected.insert(SimTime::at_delta(t, 0), value);
                    value = v;
                    expected.insert(SimTime::at_delta(t, 1), value);
                }
                (None, None) => {
                    expected.insert(SimTime::at_delta(t, 0), value);
                }
            }
        }

        let total = steps.len();
        let mut script = steps.into_iter();
        let design = Design::new()
            .signal(SignalDecl::vector("reg", 4).init_u64(0))
            .process(ProcessDecl::from_fn("driver", move |ctx| {
                let reg = ctx.signal("reg")?;
                let Some(ops) = script.next() else {
                    return Ok(());
                };
                for (fast, v) in ops {
                    let value = LogicVec::from_u64(v, 4);
                    if fast {
                        ctx.assign(reg, value)?;
                    } else {
                        ctx.assign_delta(reg, value, 0)?;
                    }
                }
                if script.len() > 0 {
                    ctx.wait_for(NS);
                }
                Ok(())
            }));

        let mut k = SimKernel::new(design).unwrap();
        let reg = k.find_signal("reg").unwrap();
        let mut slots = 0;
        while k.step().unwrap() == StepResult::Continued {
            let now = k.current_time();
            let want = expected.get(&now).copied();
            assert!(want.is_some(), "seed {seed}: unexpected slot {now}");
            assert_eq!(
                k.read(reg).unwrap().to_u64(),
                want,
                "seed {seed}: value at {now}"
            );
            slots += 1;
        }
        assert_eq!(slots, expected.len(), "seed {seed}");
        assert_eq!(
            k.process(k.find_process("driver").unwrap())
                .unwrap()
                .activations,
            total as u64
        );
    }
}

// ---------------------------------------------------------------------------
// Slot ordering on random networks
// ---------------------------------------------------------------------------

/// Builds a network of `n` processes where process `i` alone drives `s{i}`
/// and listens to a random subset of the other signals.
fn random_network(rng: &mut StdRng, n: usize) -> Design {
    let mut design = Design::new();
    for i in 0..n {
        design.add_signal(SignalDecl::vector(format!("s{i}"), 4).init_u64(0));
    }
    for i in 0..n {
        let listens: Vec<String> = (0..n)
            .filter(|_| rng.gen_bool(0.3))
            .map(|j| format!("s{j}"))
            .collect();
        let mut local = StdRng::seed_from_u64(rng.gen());
        let mut budget = 12u32;
        let own = format!("s{i}");
        let mut decl = ProcessDecl::from_fn(format!("p{i}"), move |ctx| {
            if budget == 0 {
                return Ok(());
            }
            budget -= 1;
            let sig = ctx.signal(&own)?;
            let value = LogicVec::from_u64(local.gen_range(0..16), 4);
            match local.gen_range(0..4) {
                0 => ctx.assign(sig, value)?,
                1 => ctx.assign_delta(sig, value, local.gen_range(0..3))?,
                2 => ctx.assign_after(sig, value, local.gen_range(1..5) * NS)?,
                _ => ctx.wait_for(local.gen_range(0..3) * NS),
            }
            Ok(())
        })
        .sensitive_to(listens);
        if rng.gen_bool(0.2) {
            decl = decl.on_time_advance();
        }
        design.add_process(decl);
    }
    design
}

#[test]
fn slots_are_strictly_increasing_and_drained() {
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let design = random_network(&mut rng, 8);
        let log = ActivityLog::new();
        let mut k = SimKernel::new(design).unwrap();
        k.add_observer(Box::new(log.clone()));
        assert_eq!(k.run_to_completion().unwrap(), RunStatus::Quiescent);
        assert_eq!(k.pending_events(), 0);

        let slots = log.slots();
        assert!(!slots.is_empty());
        for pair in slots.windows(2) {
            assert!(pair[0] < pair[1], "seed {seed}: {} then {}", pair[0], pair[1]);
            if pair[1].fs > pair[0].fs {
                assert_eq!(pair[1].delta, 0, "seed {seed}: time advance lands on delta 0");
            }
        }

        // Every notification belongs to the slot entered last, and
        // activations never overlap.
        let mut slot = None;
        let mut running: Option<ProcessId> = None;
        for entry in log.entries() {
            match entry {
                Activity::Slot(t) => {
                    assert!(running.is_none());
                    slot = Some(t);
                }
                Activity::Change { time, .. } => assert_eq!(Some(time), slot),
                Activity::Start { time, process, .. } => {
                    assert_eq!(Some(time), slot);
                    assert!(running.is_none(), "seed {seed}: nested activation");
                    running = Some(process);
                }
                Activity::End { time, process } => {
                    assert_eq!(Some(time), slot);
                    assert_eq!(running.take(), Some(process));
                }
            }
        }
        assert_eq!(k.total_deltas(), slots.len() as u64);
    }
}

#[test]
fn same_slot_wakeups_run_in_commit_order() {
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = 8;
        let mut design = Design::new();
        for i in 0..n {
            design.add_signal(SignalDecl::bit(format!("in{i}")).init(LogicVec::from_bool(false)));
            design.add_process(
                ProcessDecl::from_fn(format!("p{i}"), |_| Ok(()))
                    .sensitive_to([format!("in{i}")])
                    .no_init(),
            );
        }
        let log = ActivityLog::new();
        let mut k = SimKernel::new(design).unwrap();
        k.add_observer(Box::new(log.clone()));

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        for &i in &order {
            let sig = k.find_signal(&format!("in{i}")).unwrap();
            k.schedule_event(SimTime::from_ns(3), sig, LogicVec::from_bool(true))
                .unwrap();
        }
        k.run_to_completion().unwrap();

        let expected: Vec<(SimTime, ProcessId)> = order
            .iter()
            .map(|i| (SimTime::from_ns(3), k.find_process(&format!("p{i}")).unwrap()))
            .collect();
        assert_eq!(log.activations(), expected, "seed {seed}");
    }
}

#[test]
fn host_reads_are_idempotent() {
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let design = random_network(&mut rng, 5);
        let mut k = SimKernel::new(design).unwrap();
        let names: Vec<String> = (0..5).map(|i| format!("s{i}")).collect();
        loop {
            for _ in 0..3 {
                let name = names.choose(&mut rng).unwrap();
                let first = k.read_by_name(name).unwrap().clone();
                let second = k.read_by_name(name).unwrap().clone();
                assert_eq!(first, second, "seed {seed}: {name}");
            }
            if k.step().unwrap() != StepResult::Continued {
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

fn random_vec(rng: &mut StdRng, width: u32) -> LogicVec {
    let s: String = (0..width)
        .map(|_| *['0', '1', 'X', 'Z'].choose(rng).unwrap())
        .collect();
    LogicVec::from_binary_str(&s).unwrap()
}

#[test]
fn commutative_policies_ignore_driver_order() {
    let strengths = [DriveStrength::Weak, DriveStrength::Pull, DriveStrength::Strong];
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let width = rng.gen_range(1..12);
        let drivers: Vec<(DriverId, Driver)> = (0..rng.gen_range(1..6))
            .map(|i| {
                let id = DriverId::Process(ProcessId::from_raw(i));
                let driver = Driver {
                    value: random_vec(&mut rng, width),
                    strength: *strengths.choose(&mut rng).unwrap(),
                };
                (id, driver)
            })
            .collect();

        for policy in [Resolution::Ieee1164, Resolution::WiredAnd, Resolution::WiredOr] {
            let sorted = resolve(policy, drivers.iter().map(|(id, d)| (*id, d)), width).unwrap();
            let mut shuffled: Vec<&(DriverId, Driver)> = drivers.iter().collect();
            shuffled.shuffle(&mut rng);
            let other = resolve(policy, shuffled.iter().map(|(id, d)| (*id, d)), width).unwrap();
            assert_eq!(sorted, other, "seed {seed}: {policy:?}");
        }

        let strongest = resolve(
            Resolution::StrongestWins,
            drivers.iter().map(|(id, d)| (*id, d)),
            width,
        );
        let mut reversed: Vec<&(DriverId, Driver)> = drivers.iter().collect();
        reversed.reverse();
        let again = resolve(
            Resolution::StrongestWins,
            reversed.iter().map(|(id, d)| (*id, d)),
            width,
        );
        assert_eq!(strongest.is_ok(), again.is_ok(), "seed {seed}");
        if let (Ok(a), Ok(b)) = (strongest, again) {
            assert_eq!(a, b, "seed {seed}");
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration and diagnostics plumbing
// ---------------------------------------------------------------------------

fn oscillator() -> Design {
    Design::new()
        .signal(SignalDecl::bit("osc").init(LogicVec::from_bool(false)))
        .process(
            ProcessDecl::from_fn("inv", |ctx| {
                let osc = ctx.signal("osc")?;
                let v = ctx.read_bit(osc)?;
                ctx.drive(
                    Transaction::new(
                        DriverId::External,
                        osc,
                        LogicVec::from_logic(!v),
                    )
                    .with_delay(Delay::Delta(0)),
                )
            })
            .sensitive_to(["osc"]),
        )
}

#[test]
fn limits_from_project_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("dsim.toml"),
        "[run]\nmax_deltas = 16\nmax_activations = 1000\n",
    )
    .unwrap();
    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.run.max_deltas, 16);

    let mut k = SimKernel::with_config(oscillator(), &config.run).unwrap();
    let err = k.run_to_completion().unwrap_err();
    assert_eq!(
        err,
        SimError::DeltaCycleLimit {
            time: SimTime::at_delta(0, 16),
            max_deltas: 16,
            process: None,
            signal: None,
        }
    );
    assert!(err.to_string().contains("16"));
}

#[test]
fn fatal_diagnostics_serialize() {
    let mut k = SimKernel::new(oscillator()).unwrap();
    k.set_max_deltas(4);
    assert!(k.run_to_completion().is_err());

    let diags = k.diagnostics().diagnostics();
    assert_eq!(diags.len(), 1);
    let json = serde_json::to_value(&diags[0]).unwrap();
    assert_eq!(json["message"], serde_json::json!(diags[0].message));
    assert!(json["message"].as_str().unwrap().contains("delta"));

    let status = serde_json::to_string(&RunStatus::TimeLimit).unwrap();
    assert_eq!(
        serde_json::from_str::<RunStatus>(&status).unwrap(),
        RunStatus::TimeLimit
    );
}
