//! Jobs and CronJobs.

use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use kubesim_core::object;
use kubesim_objects::workload;

use crate::controllers::{create_child, spawn_pod};
use crate::engine::{Engine, Target};
use crate::error::EngineResult;
use crate::registry::KindHandler;

pub struct JobHandler;

impl KindHandler for JobHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        engine.materialize(target, |amb| workload::job(input, amb))
    }

    /// Runs `spec.completions` pods, all of which finish successfully.
    fn create(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let job = engine.insert(self, target, body)?;
        let template = job
            .pointer("/spec/template")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let completions = workload::completions(&job);
        for _ in 0..completions {
            spawn_pod(engine, &job, &template)?;
        }
        info!(job = %target.name, completions, "job completed");
        Ok(job)
    }

    fn delete(&self, engine: &mut Engine, target: &Target) -> EngineResult<Value> {
        let job = engine.remove(target)?;
        delete_owned(engine, "Pod", "pods", &job)?;
        Ok(job)
    }
}

pub struct CronJobHandler;

impl KindHandler for CronJobHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        engine.materialize(target, |amb| workload::cron_job(input, amb))
    }

    /// Spawns the first Job immediately, named after the scheduled minute.
    fn create(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let cron_job = engine.insert(self, target, body)?;
        let template = cron_job
            .pointer("/spec/jobTemplate")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let scheduled = (Utc::now().timestamp() / 60).to_string();
        let job = create_child(engine, "Job", &cron_job, &template, &scheduled)?;
        info!(
            cron_job = %target.name,
            job = object::name(&job).unwrap_or_default(),
            "cron job triggered"
        );
        Ok(cron_job)
    }

    fn delete(&self, engine: &mut Engine, target: &Target) -> EngineResult<Value> {
        let cron_job = engine.remove(target)?;
        delete_owned(engine, "Job", "jobs", &cron_job)?;
        Ok(cron_job)
    }
}

/// Delete every `kind` object in `key` owned by `owner`, cascading through
/// each child's own handler.
fn delete_owned(engine: &mut Engine, kind: &str, key: &str, owner: &Value) -> EngineResult<()> {
    let resource = engine.resource_for(kind)?;
    for child in engine.owned(key, owner)? {
        if let Some(target) = Target::of(resource, &child) {
            engine.delete(&target)?;
        }
    }
    Ok(())
}
