use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::screening::{ScreeningOutcome, ScreeningScenario};

/// Execution context for one screening run: the scenario input object with
/// its reserved `seed`/`replicate` keys, a map of attached files, and the
/// resolved output target. Parsed from the JSON run protocol on stdin.
pub struct Environment {
    input_json: serde_json::Map<String, Value>,
    pub seed: u64,
    pub replicate: u64,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let seed = input_json
            .remove("seed")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let replicate = input_json
            .remove("replicate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            seed,
            replicate,
            files,
            output,
        }
    }

    pub fn from_stdin() -> Self {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .expect("failed to read stdin");
        if raw.trim().is_empty() {
            eprintln!("Error: no input on stdin");
            std::process::exit(1);
        }
        let data: Value = serde_json::from_str(&raw).expect("failed to parse JSON from stdin");
        Self::from_json(data)
    }

    /// Resolve the scenario for this run. An attached `"scenario"` TOML file
    /// takes precedence over the inline input object, and the environment
    /// seed overrides the scenario's own.
    pub fn scenario(&self) -> Result<ScreeningScenario, ConfigError> {
        let mut scenario = match self.files.get("scenario") {
            Some(path) => {
                debug!(path = %path.display(), "loading scenario file");
                ScreeningScenario::from_toml_path(path)?
            }
            None => serde_json::from_value(Value::Object(self.input_json.clone()))?,
        };
        scenario.seed = self.seed;
        Ok(scenario)
    }

    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            if let Some(dir) = output.get("dir").and_then(|v| v.as_str()) {
                return Some(PathBuf::from(dir));
            }
            return None;
        }

        // Check profiled output — resolve default profile
        if let Some(profiles) = output.get("profile").and_then(|v| v.as_object()) {
            let selected = profiles.get("default").or_else(|| profiles.values().next());
            if let Some(profile) = selected
                && profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem")
                && let Some(dir) = profile.get("dir").and_then(|v| v.as_str())
            {
                return Some(PathBuf::from(dir));
            }
        }

        None
    }

    pub fn write(&self, filename: &str, data: &[u8]) {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir).expect("failed to create output directory");
            fs::write(dir.join(filename), data).expect("failed to write output file");
        } else {
            io::stdout()
                .write_all(data)
                .expect("failed to write to stdout");
        }
    }

    pub fn write_csv(&self, filename: &str, headers: &[&str], rows: &[Vec<String>]) {
        let writer: Box<dyn Write> = if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir).expect("failed to create output directory");
            Box::new(fs::File::create(dir.join(filename)).expect("failed to create output file"))
        } else {
            Box::new(io::stdout())
        };
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(headers).unwrap();
        for row in rows {
            wtr.write_record(row).unwrap();
        }
        wtr.flush().unwrap();
    }

    /// Emit one run's counters and detection ratio through the sink, in the
    /// full-output order: uninfected, departure, arrival, re-tests, release,
    /// undetected, ratio.
    pub fn write_counts(&self, filename: &str, outcome: &ScreeningOutcome) {
        let counts = &outcome.counts;
        let mut rows = vec![
            vec!["uninfected".to_string(), counts.uninfected.to_string()],
            vec![
                "detected_departure".to_string(),
                counts.detected_departure.to_string(),
            ],
            vec![
                "detected_arrival".to_string(),
                counts.detected_arrival.to_string(),
            ],
        ];
        for (i, n) in counts.detected_retest.iter().enumerate() {
            rows.push(vec![format!("detected_retest_{}", i + 1), n.to_string()]);
        }
        rows.push(vec![
            "detected_release".to_string(),
            counts.detected_release.to_string(),
        ]);
        rows.push(vec![
            "undetected".to_string(),
            counts.undetected.to_string(),
        ]);
        rows.push(vec![
            "detected_ratio".to_string(),
            outcome.detected_ratio.to_string(),
        ]);
        self.write_csv(filename, &["statistic", "value"], &rows);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::screening::ScreeningModel;

    #[test]
    fn test_from_json_basic() {
        let data = json!({
            "input": {
                "seed": 42,
                "replicate": 1,
                "num_people": 500
            },
            "model": {
                "files": {
                    "scenario": "/tmp/scenario.toml"
                }
            },
            "output": {
                "spec": "filesystem",
                "dir": "/tmp/output"
            }
        });
        let ctx = Environment::from_json(data);
        assert_eq!(ctx.seed, 42);
        assert_eq!(ctx.replicate, 1);
        assert_eq!(
            ctx.input_json().get("num_people").unwrap().as_u64().unwrap(),
            500
        );
        assert!(!ctx.input_json().contains_key("seed"));
        assert!(!ctx.input_json().contains_key("replicate"));
        assert_eq!(
            ctx.files.get("scenario").unwrap(),
            &PathBuf::from("/tmp/scenario.toml")
        );
        assert_eq!(ctx.output_dir(), Some(PathBuf::from("/tmp/output")));
    }

    #[test]
    fn test_scenario_from_inline_input() {
        let data = json!({
            "input": {
                "seed": 9,
                "num_people": 1000,
                "exit_sensitivity": 0.86,
                "incubation": { "kind": "weibull", "shape": 2.0, "scale": 5.0 },
                "time_scale": "days",
                "isolation": { "retests": [24.0, 48.0], "release_after": 72.0 }
            }
        });
        let scenario = Environment::from_json(data).scenario().unwrap();
        assert_eq!(scenario.num_people, 1000);
        assert_eq!(scenario.exit_sensitivity, 0.86);
        assert_eq!(scenario.seed, 9);
        assert_eq!(scenario.isolation.unwrap().retests, vec![24.0, 48.0]);
    }

    #[test]
    fn test_scenario_rejects_unknown_time_scale() {
        let data = json!({
            "input": {
                "time_scale": "weeks"
            }
        });
        let result = Environment::from_json(data).scenario();
        assert!(matches!(result, Err(ConfigError::ScenarioJson(_))));
    }

    #[test]
    fn test_scenario_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        fs::write(
            &path,
            r#"
num_people = 250
entry_sensitivity = 0.9

[flight]
kind = "uniform"
low = 10.0
high = 12.0

[isolation]
retests = [24.0]
release_after = 48.0
"#,
        )
        .unwrap();

        let data = json!({
            "input": { "seed": 5 },
            "model": { "files": { "scenario": path.to_str().unwrap() } }
        });
        let scenario = Environment::from_json(data).scenario().unwrap();
        assert_eq!(scenario.num_people, 250);
        assert_eq!(scenario.entry_sensitivity, 0.9);
        // Environment seed wins over the file's.
        assert_eq!(scenario.seed, 5);
    }

    #[test]
    fn test_output_dir_profiled() {
        let data = json!({
            "input": {},
            "output": {
                "profile": {
                    "default": {
                        "spec": "filesystem",
                        "dir": "/tmp/profiled"
                    }
                }
            }
        });
        let ctx = Environment::from_json(data);
        assert_eq!(ctx.output_dir(), Some(PathBuf::from("/tmp/profiled")));
    }

    #[test]
    fn test_output_dir_none() {
        let data = json!({
            "input": {},
            "output": {
                "spec": "stdout"
            }
        });
        let ctx = Environment::from_json(data);
        assert_eq!(ctx.output_dir(), None);
    }

    #[test]
    fn test_defaults() {
        let ctx = Environment::from_json(json!({}));
        assert_eq!(ctx.seed, 0);
        assert_eq!(ctx.replicate, 0);
        assert!(ctx.input_json().is_empty());
        assert!(ctx.files.is_empty());
        assert_eq!(ctx.output_dir(), None);

        // An empty input object is a valid scenario: all defaults.
        let scenario = ctx.scenario().unwrap();
        assert_eq!(scenario.num_people, 10);
        assert_eq!(scenario.exit_sensitivity, 1.0);
    }

    #[test]
    fn test_write_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let data = json!({
            "input": {},
            "output": {
                "spec": "filesystem",
                "dir": dir.path().to_str().unwrap()
            }
        });
        let ctx = Environment::from_json(data);
        ctx.write("notes.txt", b"all travellers cleared");
        let written = fs::read_to_string(dir.path().join("notes.txt")).unwrap();
        assert_eq!(written, "all travellers cleared");
    }

    #[test]
    fn test_write_counts_csv() {
        let dir = tempfile::tempdir().unwrap();
        let data = json!({
            "input": {
                "num_people": 100,
                "exposure": { "kind": "fixed", "value": 48.0 },
                "incubation": { "kind": "fixed", "value": 55.0 },
                "flight": { "kind": "fixed", "value": 12.0 }
            },
            "output": {
                "spec": "filesystem",
                "dir": dir.path().to_str().unwrap()
            }
        });
        let ctx = Environment::from_json(data);
        let outcome = ScreeningModel::run(&ctx.scenario().unwrap()).unwrap();
        ctx.write_counts("screening_output.csv", &outcome);

        let written = fs::read_to_string(dir.path().join("screening_output.csv")).unwrap();
        assert!(written.starts_with("statistic,value"));
        assert!(written.contains("detected_arrival,100"));
        assert!(written.contains("detected_ratio,1"));
    }
}
