//! # Calculator pipelines
//!
//! Demonstrates basic pipevisor features:
//! - Pipelines running in their own processes
//! - Unit-level logs and unit status lines
//! - A failing run and a run interrupted by the user
//! - Clients attached and detached while pipelines run
//!
//! Run with: `cargo run --example calculator --features logging`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use pipevisor::{
    ChannelClient, Config, EventBus, LogWriter, Pipeline, PipelineFn, PipelineLogger,
    PipelineManager, RunContext, StatusCode,
};

/// Adds and multiplies a fixed set of operands, one unit per operation.
struct Calculator {
    operands: Vec<i64>,
}

impl Pipeline for Calculator {
    fn name(&self) -> &str {
        "calc"
    }

    fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let add = ctx.unit("add");
        add.status(StatusCode::Running);
        let sum: i64 = self.operands.iter().sum();
        add.info(format!("sum={sum}"));
        add.status(StatusCode::Finished);

        let mul = ctx.unit("multiply");
        mul.status(StatusCode::Running);
        let product = self
            .operands
            .iter()
            .try_fold(1_i64, |acc, x| acc.checked_mul(*x))
            .context("product overflowed")?;
        mul.info(format!("product={product}"));
        mul.status(StatusCode::Finished);
        Ok(())
    }

    fn on_status_changed(&self, status: StatusCode, logger: &PipelineLogger) {
        logger.status(status);
        if status == StatusCode::Failed {
            logger.warn("calculator failed; check the operands");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::new(Config::default()));
    bus.start()?;
    bus.add_client(Arc::new(LogWriter::default()))?;

    let manager = PipelineManager::new(Arc::clone(&bus));
    manager
        .add_pipeline(Arc::new(Calculator {
            operands: vec![2, 3, 7],
        }))
        .await;
    manager
        .add_pipeline(PipelineFn::arc("divide", |ctx: &RunContext| {
            let div = ctx.unit("divide");
            let (a, b) = (10_i64, 0_i64);
            div.info(format!("dividing {a} by {b}"));
            if b == 0 {
                bail!("division by zero");
            }
            div.info(format!("quotient={}", a / b));
            Ok(())
        }))
        .await;
    manager
        .add_pipeline(PipelineFn::arc("ticker", |ctx: &RunContext| {
            let mut tick = 0_u64;
            loop {
                ctx.logger().info(format!("tick {tick}"));
                tick += 1;
                std::thread::sleep(Duration::from_millis(200));
            }
        }))
        .await;

    // A second client joins midway and only sees what happens afterwards.
    let (late, mut late_rx) = ChannelClient::new("late-viewer");

    manager.start_pipeline("calc").await?;
    manager.start_pipeline("divide").await?;
    manager.start_pipeline("ticker").await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    bus.add_client(late)?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    manager.stop_pipeline("ticker").await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    bus.remove_client("late-viewer")?;

    let mut seen = 0;
    while let Ok(event) = late_rx.try_recv() {
        seen += 1;
        if seen == 1 {
            println!("late viewer's first event: {}", serde_json::to_string(&event)?);
        }
    }
    println!("late viewer received {seen} events");

    for name in manager.pipelines().await {
        println!("{name}: {:?}", manager.status(&name).await?);
    }

    manager.shutdown().await;
    bus.stop().await?;
    Ok(())
}
