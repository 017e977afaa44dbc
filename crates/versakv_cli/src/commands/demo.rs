//! Demo command implementation.

use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use versakv_core::{CoreResult, Engine, ReadResult};

/// Outcome of one scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Scenario label.
    pub name: &'static str,
    /// What the scenario does.
    pub description: &'static str,
    /// Expected final read.
    pub expected: ReadResult,
    /// Actual final read.
    pub actual: ReadResult,
}

impl ScenarioOutcome {
    /// Returns true if the scenario read what it expected.
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// Runs the demo command.
pub fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Running demo scenarios against {:?}", path.unwrap_or(Path::new(":memory:")));
    let engine = match path {
        Some(path) => Engine::open(path)?,
        None => Engine::open_in_memory(),
    };

    let outcomes = run_scenarios(&engine)?;
    for outcome in &outcomes {
        if outcome.passed() {
            info!(scenario = outcome.name, actual = %outcome.actual, "scenario passed");
        } else {
            warn!(
                scenario = outcome.name,
                expected = %outcome.expected,
                actual = %outcome.actual,
                "scenario failed"
            );
        }
    }
    print_text_output(&outcomes);

    let failed = outcomes.iter().filter(|o| !o.passed()).count();
    engine.close()?;
    if failed > 0 {
        return Err(format!("{failed} scenario(s) failed").into());
    }
    Ok(())
}

/// Runs scenarios A to D against `engine`.
pub fn run_scenarios(engine: &Engine) -> CoreResult<Vec<ScenarioOutcome>> {
    Ok(vec![
        ScenarioOutcome {
            name: "A",
            description: "put 3, commit, read",
            expected: ReadResult::Value(3),
            actual: scenario_a(engine)?,
        },
        ScenarioOutcome {
            name: "B",
            description: "put 3, commit, inc, commit, read",
            expected: ReadResult::Value(4),
            actual: scenario_b(engine)?,
        },
        ScenarioOutcome {
            name: "C",
            description: "read blocks on uncommitted put 5 until commit",
            expected: ReadResult::Value(5),
            actual: scenario_c(engine)?,
        },
        ScenarioOutcome {
            name: "D",
            description: "put 3, commit, inc, abort, read",
            expected: ReadResult::Value(3),
            actual: scenario_d(engine)?,
        },
    ])
}

fn scenario_a(engine: &Engine) -> CoreResult<ReadResult> {
    let t1 = engine.begin();
    engine.put("A", 3, t1)?;
    engine.commit(t1)?;

    read_committed(engine)
}

fn scenario_b(engine: &Engine) -> CoreResult<ReadResult> {
    let t1 = engine.begin();
    engine.put("A", 3, t1)?;
    engine.commit(t1)?;

    let t2 = engine.begin();
    engine.inc("A", t2)?;
    engine.commit(t2)?;

    read_committed(engine)
}

fn scenario_c(engine: &Engine) -> CoreResult<ReadResult> {
    let t1 = engine.begin();
    engine.put("A", 5, t1)?;
    let t2 = engine.begin();

    thread::scope(|scope| -> CoreResult<ReadResult> {
        let reader = scope.spawn(|| engine.get("A", t2));
        thread::sleep(Duration::from_millis(20));
        engine.commit(t1)?;
        let result = reader
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
        engine.commit(t2)?;
        Ok(result)
    })
}

fn scenario_d(engine: &Engine) -> CoreResult<ReadResult> {
    let t1 = engine.begin();
    engine.put("A", 3, t1)?;
    engine.commit(t1)?;

    let t2 = engine.begin();
    engine.inc("A", t2)?;
    engine.abort(t2)?;

    read_committed(engine)
}

fn read_committed(engine: &Engine) -> CoreResult<ReadResult> {
    let tid = engine.begin();
    let result = engine.get("A", tid)?;
    engine.commit(tid)?;
    Ok(result)
}

fn print_text_output(outcomes: &[ScenarioOutcome]) {
    println!("versakv Scenarios");
    println!("=================");
    println!();
    for outcome in outcomes {
        let status = if outcome.passed() { "ok" } else { "FAILED" };
        println!(
            "  [{}] {:<48} expected {:<10} got {:<10} {}",
            outcome.name, outcome.description, outcome.expected, outcome.actual, status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_pass_in_memory() {
        let engine = Engine::open_in_memory();
        let outcomes = run_scenarios(&engine).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(ScenarioOutcome::passed));
    }

    #[test]
    fn run_in_memory_reports_success() {
        run(None).unwrap();
    }

    #[test]
    fn scenarios_pass_on_disk_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo");
        run(Some(&path)).unwrap();
        run(Some(&path)).unwrap();
    }
}
