//! Manvel - 小说转漫画生成服务
//!
//! - Domain: novel/, character/, scene/, media/, task/ (Bounded Contexts)
//! - Application: commands, queries, ports, workflow
//! - Infrastructure: http, memory, worker, persistence, adapters

use std::sync::Arc;

use manvel::application::{
    Heuristics, ImageGeneratorPort, TaskManagerPort, WorkflowDeps, WorkflowOrchestrator,
    WorkflowSettings,
};
use manvel::config::{load_config, print_config, AppConfig, GenerationProvider};
use manvel::domain::rules::RuleSet;
use manvel::domain::scene::PromptStyle;
use manvel::domain::task::ErrorCode;
use manvel::infrastructure::adapters::{FakeImageClient, HttpImageClient, HttpImageClientConfig};
use manvel::infrastructure::http::{AppState, HttpServer, ServerConfig};
use manvel::infrastructure::memory::InMemoryTaskManager;
use manvel::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteCharacterRepository,
    SqliteMediaRepository, SqliteNovelRepository, SqliteSceneRepository, SqliteTaskRepository,
};
use manvel::infrastructure::worker::{WorkflowWorker, WorkflowWorkerConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},manvel={},tower_http=debug,sqlx=warn",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_image_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn ImageGeneratorPort>> {
    let generation = &config.generation;
    Ok(match generation.provider {
        GenerationProvider::Http => {
            let client_config = HttpImageClientConfig::new(&generation.url, &generation.api_key)
                .with_model(&generation.model)
                .with_timeout(generation.timeout_secs);
            Arc::new(HttpImageClient::new(client_config)?)
        }
        GenerationProvider::Fake => {
            tracing::warn!("Using fake image generator, no images will be produced");
            Arc::new(FakeImageClient::default())
        }
    })
}

fn load_rules(config: &AppConfig) -> anyhow::Result<RuleSet> {
    match &config.rules.path {
        Some(path) => {
            let rules = RuleSet::load(path)?;
            tracing::info!(path = %path.display(), "Heuristic rules loaded");
            Ok(rules)
        }
        None => Ok(RuleSet::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("Manvel - 小说转漫画生成服务");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 工作队列
    let (task_tx, task_rx) = mpsc::channel(config.workflow.queue_capacity);
    let task_manager = InMemoryTaskManager::new(task_tx).arc();

    let deps = WorkflowDeps {
        task_repo: Arc::new(SqliteTaskRepository::new(pool.clone())),
        novel_repo: Arc::new(SqliteNovelRepository::new(pool.clone())),
        character_repo: Arc::new(SqliteCharacterRepository::new(pool.clone())),
        scene_repo: Arc::new(SqliteSceneRepository::new(pool.clone())),
        media_repo: Arc::new(SqliteMediaRepository::new(pool.clone())),
        image_generator: build_image_generator(&config)?,
        task_manager: task_manager.clone(),
        heuristics: Heuristics::compile(&load_rules(&config)?)?,
    };

    let style = PromptStyle::from_str(&config.workflow.style).unwrap_or_default();
    let settings = WorkflowSettings {
        portrait_size: config.workflow.portrait_size,
        scene_width: config.workflow.scene_width,
        scene_height: config.workflow.scene_height,
        reference_strength: config.workflow.reference_strength,
        style,
    };
    let orchestrator = Arc::new(WorkflowOrchestrator::new(deps.clone(), settings));

    // 启动恢复：中断的任务置为失败，pending 任务重新入队
    for task_id in orchestrator.recover_interrupted().await? {
        if let Err(e) = task_manager.enqueue(task_id) {
            tracing::warn!(task_id = %task_id, error = %e, "Failed to requeue pending task");
            orchestrator
                .fail_task(task_id, ErrorCode::QUEUE_REJECTED, &e.to_string())
                .await?;
        }
    }

    // 启动 Worker
    let shutdown = CancellationToken::new();
    let worker = WorkflowWorker::new(
        WorkflowWorkerConfig {
            max_concurrent: config.workflow.max_concurrent,
        },
        task_rx,
        orchestrator,
    );
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let server = HttpServer::new(server_config, AppState::new(&deps));

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    // 停止接收新任务，等待执行中的流程结束
    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "Worker task failed");
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}
