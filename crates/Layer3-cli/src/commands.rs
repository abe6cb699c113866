//! Runtime subcommands

use crate::RuntimeCommand;
use anyhow::{bail, Context};
use rtpanel_runtime::{Runtime, RuntimeCreate, RuntimeService, RuntimeStatus, RuntimeTask};
use serde_json::Value;

pub async fn run(service: &RuntimeService, command: RuntimeCommand) -> anyhow::Result<()> {
    match command {
        RuntimeCommand::Create {
            kind,
            name,
            template,
            image,
            source,
            version,
            code_dir,
            install,
            params,
        } => {
            let mut create = RuntimeCreate::new(name, kind.parse()?)
                .with_image(image)
                .with_source(source)
                .with_version(version)
                .with_code_dir(code_dir)
                .with_install(install);
            for param in &params {
                let (key, value) = parse_param(param)?;
                create = create.with_param(key, value);
            }

            let provisioned = service
                .create(&create, &template)
                .with_context(|| format!("Failed to provision runtime {}", create.name))?;
            println!(
                "Runtime {} created (id {}), {}...",
                provisioned.runtime.name, provisioned.runtime.id, provisioned.runtime.status
            );
            finish(provisioned.task).await
        }
        RuntimeCommand::Rebuild { id } => finish(service.rebuild(id).await?).await,
        RuntimeCommand::Recreate { id } => finish(service.recreate(id)?).await,
        RuntimeCommand::List => {
            for runtime in service.list()? {
                print_runtime(&runtime);
            }
            Ok(())
        }
    }
}

/// Wait for the task and any cascade, then report the persisted outcome
async fn finish(task: RuntimeTask) -> anyhow::Result<()> {
    let kind = task.kind();
    let (runtime, cascade) = task.wait().await?.wait_cascade().await;
    for (install_id, result) in &cascade {
        match result {
            Ok(()) => println!("  install {} rebuilt", install_id),
            Err(e) => println!("  install {} failed: {}", install_id, e),
        }
    }
    print_runtime(&runtime);
    if runtime.status == RuntimeStatus::Error {
        bail!("{} failed for runtime {}", kind, runtime.name);
    }
    Ok(())
}

fn print_runtime(runtime: &Runtime) {
    if runtime.message.is_empty() {
        println!("{:>4}  {:<5} {:<20} {}", runtime.id, runtime.kind, runtime.name, runtime.status);
    } else {
        println!(
            "{:>4}  {:<5} {:<20} {}  {}",
            runtime.id,
            runtime.kind,
            runtime.name,
            runtime.status,
            runtime.message.trim_end()
        );
    }
}

/// `KEY=VALUE`; VALUE is parsed as JSON when it can be, otherwise kept as a string
fn parse_param(raw: &str) -> anyhow::Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("parameter {:?} is not KEY=VALUE", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("parameter {:?} has an empty key", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
