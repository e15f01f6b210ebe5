//! # 示例应用程序
//!
//! 扫描源码目录，打印类型解析结果

use anyhow::Context;
use clap::{Parser, Subcommand};
use config_impl::SettingsLoader;
use di_abstractions::TypeRegistry;
use infrastructure_common::GraphError;
use infrastructure_composition::{Autowire, AutowireBuilder, LoggingConfig};
use std::path::PathBuf;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "扫描源码并查询类型图")]
struct Args {
    /// 配置文件路径（不存在时使用默认设置）
    #[arg(short, long, default_value = "config/autowire.toml")]
    config: PathBuf,

    /// 额外的扫描路径
    #[arg(short, long = "path")]
    paths: Vec<PathBuf>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 日志
    #[arg(long)]
    json_logs: bool,

    /// 使用内存缓存，不写磁盘
    #[arg(long)]
    memory_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 解析名称对应的具体类型
    Resolve {
        /// 类型名，例如 `App\Mailer`
        #[arg(required = true)]
        names: Vec<String>,

        /// 列出所有可实例化的实现，而不是要求唯一解
        #[arg(long)]
        all: bool,
    },
    /// 列出已注册的类型
    List,
    /// 打印生效的设置
    Settings,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut loader = SettingsLoader::new().with_optional_file(&args.config);
    if args.memory_cache {
        loader = loader.with_override("cache.backend", "memory");
    }

    let mut builder = AutowireBuilder::from_loader(&loader)
        .with_context(|| format!("无法加载设置: {}", args.config.display()))?;
    for path in &args.paths {
        builder = builder.add_path(path);
    }

    if let Command::Settings = args.command {
        println!("{}", builder.settings().to_toml_string()?);
        return Ok(());
    }

    let logging = LoggingConfig {
        json_format: args.json_logs,
        ..LoggingConfig::default().with_level(&args.log_level)
    };
    let autowire = builder.with_logging(logging).build().context("构建自动装配核心失败")?;
    info!("类型图已就绪: {} 个类型", autowire.graph().read().len());

    match args.command {
        Command::Resolve { names, all } => resolve(&autowire, &names, all),
        Command::List => {
            list(&autowire);
            Ok(())
        }
        Command::Settings => Ok(()),
    }
}

fn resolve(autowire: &Autowire, names: &[String], all: bool) -> anyhow::Result<()> {
    let mut failed = 0;
    for name in names {
        let result = if all {
            autowire
                .graph()
                .write()
                .find_all_concrete_types(name, &[])
                .map(|types| types.join(", "))
        } else {
            autowire.find_concrete_type(name)
        };

        match result {
            Ok(resolved) => {
                println!("{name} => {resolved}");
                let ancestors = autowire.graph().read().ancestors(name);
                if !ancestors.is_empty() {
                    println!("    祖先: {}", ancestors.join(", "));
                }
            }
            Err(GraphError::AmbiguousResolution { candidates, .. }) => {
                failed += 1;
                println!("{name} => 存在多个实现:");
                for candidate in candidates {
                    println!("    {} ({})", candidate.name, candidate.source_path.display());
                }
            }
            Err(err) => {
                failed += 1;
                warn!("解析 {} 失败: {}", name, err);
                println!("{name} => 错误: {err}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} 个名称未能解析");
    }
    Ok(())
}

fn list(autowire: &Autowire) {
    let graph = autowire.graph().read();
    let mut names = graph.type_names();
    names.sort();

    for name in names {
        let Some(record) = graph.record(&name) else {
            continue;
        };
        let kind = if record.instantiable { "类" } else { "抽象" };
        let dependencies = record
            .extra_info
            .get("dependencies")
            .map(|value| format!(" 依赖: {value}"))
            .unwrap_or_default();
        println!(
            "{:<48} {:<4} {}{}",
            record.qualified_name,
            kind,
            record.source_path.display(),
            dependencies
        );
    }
}
