use clap::Parser;

/// 图像生成转发服务
#[derive(Parser, Debug)]
#[command(name = "flux-rs", version, about)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<String>,

    /// .env 文件路径（默认读取当前目录下的 .env）
    #[arg(long)]
    pub env_file: Option<String>,
}
