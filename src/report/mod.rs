//! Job-script execution and report rendering
//! Runs each statement against the handbook and collects the results

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ast::*;
use crate::catalog::Condition;
use crate::handbook::{
    EvalError, Evaluated, Handbook, KienzleCorrections, ModelWarning, Recommendation,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("no material selected; start the script with 'material <id>'")]
    NoMaterial,

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Value produced by one statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryResult {
    MaterialSelected {
        id: String,
        name: String,
        condition: Condition,
        hardness_hrc: f64,
    },
    SpecificCuttingForce {
        kc_n_mm2: f64,
    },
    CuttingForce {
        kc_n_mm2: f64,
        force_n: f64,
    },
    FlowStress {
        stress_mpa: f64,
    },
    ToolLife {
        life_min: f64,
    },
    CuttingSpeed {
        speed_m_min: f64,
    },
    Recommendation(Recommendation),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok {
        result: QueryResult,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<ModelWarning>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub line: usize,
    pub statement: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptReport {
    pub entries: Vec<ReportEntry>,
}

impl ScriptReport {
    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Error { .. }))
            .count()
    }
}

/// Evaluate a parsed script.
///
/// Each statement succeeds or fails on its own; a failure is recorded in its
/// entry and the run continues. A failed `material` statement clears the
/// selection so later queries cannot hit the previous material by accident.
pub fn run_script(handbook: &Handbook<'_>, script: &Script) -> ScriptReport {
    let mut current: Option<String> = None;
    let mut report = ScriptReport::default();

    for statement in &script.statements {
        let result = match &statement.kind {
            StatementKind::Material(id) => {
                let selected = evaluate(handbook, id, &statement.kind);
                current = selected.as_ref().ok().map(|_| id.clone());
                selected
            }
            kind => match current.as_deref() {
                Some(material) => evaluate(handbook, material, kind),
                None => Err(ScriptError::NoMaterial),
            },
        };

        let outcome = match result {
            Ok(evaluated) => Outcome::Ok {
                result: evaluated.value,
                warnings: evaluated.warnings,
            },
            Err(e) => {
                debug!(line = statement.line, error = %e, "statement failed");
                Outcome::Error {
                    message: e.to_string(),
                }
            }
        };

        report.entries.push(ReportEntry {
            line: statement.line,
            statement: statement.kind.keyword(),
            material: current.clone(),
            outcome,
        });
    }

    report
}

fn evaluate(
    handbook: &Handbook<'_>,
    material: &str,
    kind: &StatementKind,
) -> Result<Evaluated<QueryResult>, ScriptError> {
    let result = match kind {
        StatementKind::Material(id) => {
            let record = handbook.material(id)?;
            Evaluated::new(QueryResult::MaterialSelected {
                id: record.id.clone(),
                name: record.name.clone(),
                condition: record.condition,
                hardness_hrc: record.hardness.rockwell_c,
            })
        }
        StatementKind::Force(query) => {
            let corrections = KienzleCorrections {
                geometry: query.geometry,
                temperature_c: query.temperature_c,
                speed_m_min: query.speed_m_min,
            };
            let kc = handbook.specific_cutting_force(material, query.chip_thickness_mm, &corrections)?;
            match query.chip_width_mm {
                Some(width) => {
                    let force = handbook.cutting_force(
                        material,
                        query.chip_thickness_mm,
                        width,
                        &corrections,
                    )?;
                    force.map(|force_n| QueryResult::CuttingForce {
                        kc_n_mm2: kc.value,
                        force_n,
                    })
                }
                None => kc.map(|kc_n_mm2| QueryResult::SpecificCuttingForce { kc_n_mm2 }),
            }
        }
        StatementKind::Stress(query) => handbook
            .flow_stress(material, query.strain, query.strain_rate, query.temperature_c)?
            .map(|stress_mpa| QueryResult::FlowStress { stress_mpa }),
        StatementKind::Life(query) => handbook
            .tool_life(material, query.speed_m_min, query.depth_mm, &query.coolant)?
            .map(|life_min| QueryResult::ToolLife { life_min }),
        StatementKind::Speed(query) => {
            let speed_m_min =
                handbook.speed_for_tool_life(material, query.life_min, query.depth_mm, &query.coolant)?;
            Evaluated::new(QueryResult::CuttingSpeed { speed_m_min })
        }
        StatementKind::Recommend(operation) => handbook
            .recommend_named(material, operation)?
            .map(QueryResult::Recommendation),
    };
    Ok(result)
}

impl std::fmt::Display for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryResult::MaterialSelected {
                id,
                name,
                condition,
                hardness_hrc,
            } => write!(f, "{} {} ({}, {:.0} HRC)", id, name, condition, hardness_hrc),
            QueryResult::SpecificCuttingForce { kc_n_mm2 } => write!(f, "kc = {:.1} N/mm²", kc_n_mm2),
            QueryResult::CuttingForce { kc_n_mm2, force_n } => {
                write!(f, "kc = {:.1} N/mm², Fc = {:.1} N", kc_n_mm2, force_n)
            }
            QueryResult::FlowStress { stress_mpa } => write!(f, "σ = {:.1} MPa", stress_mpa),
            QueryResult::ToolLife { life_min } => write!(f, "T = {:.2} min", life_min),
            QueryResult::CuttingSpeed { speed_m_min } => write!(f, "v = {:.1} m/min", speed_m_min),
            QueryResult::Recommendation(rec) => write!(f, "{}", rec),
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env = &self.envelope;
        writeln!(f, "{} {} ({})", self.material_id, self.operation, self.source)?;
        write!(
            f,
            "  speed   {:>8.1} {:>8.1} {:>8.1}  m/min",
            env.speed.min, env.speed.optimal, env.speed.max
        )?;
        write!(
            f,
            "\n  feed    {:>8.3} {:>8.3} {:>8.3}  {}",
            env.feed.min,
            env.feed.optimal,
            env.feed.max,
            self.operation.feed_unit()
        )?;
        if let Some(depth) = env.depth {
            write!(
                f,
                "\n  depth   {:>8.2} {:>8.2} {:>8.2}  mm",
                depth.min, depth.optimal, depth.max
            )?;
        }
        if let Some(radial) = env.radial_depth_percent {
            write!(
                f,
                "\n  radial  {:>8.0} {:>8.0} {:>8.0}  %",
                radial.min, radial.optimal, radial.max
            )?;
        }
        if let Some(life) = self.tool_life_at_optimal_min {
            write!(f, "\n  tool life at optimal speed: {:.1} min", life)?;
        }
        if let (Some(kc), Some(power)) = (self.specific_cutting_force_n_mm2, self.cutting_power_kw) {
            write!(f, "\n  kc {:.0} N/mm², power {:.2} kW", kc, power)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            match &entry.outcome {
                Outcome::Ok { result, warnings } => {
                    writeln!(f, "{:>4}  {:<10} {}", entry.line, entry.statement, result)?;
                    for warning in warnings {
                        writeln!(f, "      warning: {}", warning)?;
                    }
                }
                Outcome::Error { message } => {
                    writeln!(f, "{:>4}  {:<10} error: {}", entry.line, entry.statement, message)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::EvaluatorConfig;
    use crate::parser::parse_script;
    use approx::assert_relative_eq;

    fn run(source: &str) -> ScriptReport {
        let handbook = Handbook::new(Catalog::builtin().unwrap(), EvaluatorConfig::default());
        let script = parse_script(source).expect("script should parse");
        run_script(&handbook, &script)
    }

    fn result(entry: &ReportEntry) -> &QueryResult {
        match &entry.outcome {
            Outcome::Ok { result, .. } => result,
            Outcome::Error { message } => panic!("line {} failed: {}", entry.line, message),
        }
    }

    #[test]
    fn test_run_a2_script() {
        let report = run("material P-CS-109\nforce chip 0.15\nforce chip 0.15 width 2\nrecommend turning");
        assert_eq!(report.failed(), 0);
        assert_eq!(report.entries.len(), 4);

        match result(&report.entries[1]) {
            QueryResult::SpecificCuttingForce { kc_n_mm2 } => {
                assert_relative_eq!(*kc_n_mm2, 2150.0 * 0.15f64.powf(-0.22), max_relative = 1e-12)
            }
            other => panic!("unexpected result {:?}", other),
        }
        match result(&report.entries[2]) {
            QueryResult::CuttingForce { kc_n_mm2, force_n } => {
                assert_relative_eq!(*force_n, kc_n_mm2 * 0.15 * 2.0, max_relative = 1e-12)
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(result(&report.entries[3]), QueryResult::Recommendation(_)));
        assert!(report.entries.iter().all(|e| e.material.as_deref() == Some("P-CS-109")));
    }

    #[test]
    fn test_failures_are_isolated() {
        let report = run(
            "life speed 30 depth 1.5 coolant dry\n\
             material P-CS-110\n\
             life speed 30 depth 1.5 coolant nitrogen\n\
             recommend grinding\n\
             life speed 30 depth 1.5 coolant dry",
        );

        assert_eq!(report.failed(), 3);
        assert!(matches!(
            &report.entries[0].outcome,
            Outcome::Error { message } if message.contains("no material selected")
        ));
        assert!(matches!(
            &report.entries[2].outcome,
            Outcome::Error { message } if message.contains("nitrogen")
        ));
        assert!(matches!(
            &report.entries[3].outcome,
            Outcome::Error { message } if message.contains("grinding")
        ));
        match result(&report.entries[4]) {
            QueryResult::ToolLife { life_min } => assert!(*life_min > 0.0 && life_min.is_finite()),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_unknown_material_clears_selection() {
        let report = run("material P-CS-101\nmaterial P-CS-999\nforce chip 0.2");
        assert_eq!(report.failed(), 2);
        assert_eq!(report.entries[1].material, None);
        assert!(matches!(
            &report.entries[2].outcome,
            Outcome::Error { message } if message.contains("no material selected")
        ));
    }

    #[test]
    fn test_warnings_are_kept() {
        let report = run("material P-CS-109\nstress strain 0.1 rate 100 temp 1500");
        match &report.entries[1].outcome {
            Outcome::Ok { result, warnings } => {
                assert_eq!(result, &QueryResult::FlowStress { stress_mpa: 0.0 });
                assert!(matches!(warnings.as_slice(), [ModelWarning::AboveMeltingPoint { .. }]));
            }
            Outcome::Error { message } => panic!("unexpected error {}", message),
        }
        assert!(report.to_string().contains("warning:"));
    }

    #[test]
    fn test_speed_query_inverts_life() {
        let report = run("material P-CS-110\nspeed life 20 depth 1.5 coolant flood");
        let speed = match result(&report.entries[1]) {
            QueryResult::CuttingSpeed { speed_m_min } => *speed_m_min,
            other => panic!("unexpected result {:?}", other),
        };
        let check = run(&format!(
            "material P-CS-110\nlife speed {} depth 1.5 coolant flood",
            speed
        ));
        match result(&check.entries[1]) {
            QueryResult::ToolLife { life_min } => assert_relative_eq!(*life_min, 20.0, max_relative = 1e-6),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_json_report_shape() {
        let report = run("material P-CS-112\nrecommend drilling");
        let json = serde_json::to_value(&report).unwrap();
        let entry = &json["entries"][1];
        assert_eq!(entry["status"], "ok");
        assert_eq!(entry["statement"], "recommend");
        assert_eq!(entry["result"]["kind"], "recommendation");
        assert_eq!(entry["result"]["source"], "derived");
    }
}
