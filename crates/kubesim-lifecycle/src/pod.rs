//! Pod handler: scheduling on every write, plus `log` and `exec`.

use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::debug;

use kubesim_objects::workload;

use crate::engine::{Engine, Target};
use crate::error::{EngineError, EngineResult};
use crate::registry::KindHandler;
use crate::scheduling::place;

const LOG_CONTENT: &str = "This is the log message from the fake client";

pub struct PodHandler;

impl KindHandler for PodHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        let placement = place(engine, input)?;
        engine.materialize(target, |amb| workload::pod(input, amb, &placement))
    }

    fn operation(
        &self,
        engine: &mut Engine,
        target: &Target,
        operation: &str,
        params: &HashMap<String, String>,
    ) -> EngineResult<Value> {
        match operation {
            "log" => {
                engine.find(target)?;
                Ok(json!({ "content": LOG_CONTENT }))
            }
            "exec" => {
                engine.find(target)?;
                let command = params.get("command").map(String::as_str).unwrap_or_default();
                debug!(pod = %target.name, %command, "exec");
                Ok(json!({
                    "stdout": command,
                    "stderr": "",
                    "exitCode": 0,
                }))
            }
            _ => Err(EngineError::unknown_resource()),
        }
    }
}
