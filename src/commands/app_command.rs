use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// 缺省参数从 `PODIO_APP_ID` / `PODIO_APP_TOKEN` 读取
    Fetch {
        app_id: Option<String>,
        app_token: Option<String>,
    },
    Load {
        path: String,
    },
    Submit,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl AppCommand {
    /// 是否交给后台任务执行（其余命令由界面线程直接处理）
    pub fn is_background(&self) -> bool {
        matches!(
            self,
            AppCommand::Fetch { .. } | AppCommand::Load { .. } | AppCommand::Help | AppCommand::Unknown(_)
        )
    }
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('/');
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "fetch" => {
                if parts.len() > 3 {
                    return Ok(AppCommand::Unknown(
                        "用法: fetch [app_id] [app_token]".to_string(),
                    ));
                }
                Ok(AppCommand::Fetch {
                    app_id: parts.get(1).map(|s| s.to_string()),
                    app_token: parts.get(2).map(|s| s.to_string()),
                })
            }
            "load" => {
                let path = parts[1..].join(" ");
                if path.is_empty() {
                    Ok(AppCommand::Unknown("用法: load <path>".to_string()))
                } else {
                    Ok(AppCommand::Load { path })
                }
            }
            "submit" => Ok(AppCommand::Submit),
            "reset" => Ok(AppCommand::Reset),
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}
