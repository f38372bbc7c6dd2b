//! 快照持久化
//!
//! 写入最新快照（data.json）、每日归档（history/YYYY-MM-DD.json）与名称映射

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Asia::Taipei;
use chrono_tz::Tz;

use crate::config::OutputConfig;
use crate::models::{InstrumentReport, Snapshot};

/// 获取台北时间（UTC+8）
pub fn taipei_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&Taipei)
}

/// 以当前时间组装快照
pub fn build_snapshot(stocks: Vec<InstrumentReport>) -> Snapshot {
    Snapshot {
        updated_at: taipei_now().to_rfc3339(),
        stocks,
    }
}

/// 某日归档文件路径
pub fn history_path(history_dir: &Path, date: &str) -> PathBuf {
    history_dir.join(format!("{}.json", date))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("无法创建目录 {}", parent.display()))?;
    }
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    fs::write(path, content).with_context(|| format!("写入 {} 失败", path.display()))?;
    Ok(())
}

/// 写入最新快照与当日归档，返回写入的路径
pub fn write_snapshot(snapshot: &Snapshot, output: &OutputConfig) -> Result<Vec<PathBuf>> {
    write_json(&output.data_path, snapshot, true)?;
    log::info!("💾 已儲存至 {}", output.data_path.display());

    let today = taipei_now().format("%Y-%m-%d").to_string();
    let archive = history_path(&output.history_dir, &today);
    write_json(&archive, snapshot, true)?;
    log::info!("📅 已儲存歷史快照至 {}", archive.display());

    Ok(vec![output.data_path.clone(), archive])
}

/// 写入名称映射（按代码排序）
pub fn write_names(names: &HashMap<String, String>, path: &Path) -> Result<()> {
    let sorted: BTreeMap<&String, &String> = names.iter().collect();
    write_json(path, &sorted, false)?;

    let size_kb = fs::metadata(path).map(|m| m.len() / 1024).unwrap_or(0);
    log::info!(
        "📝 已輸出名稱映射至 {}（{} 筆，約 {} KB）",
        path.display(),
        names.len(),
        size_kb
    );
    Ok(())
}

/// 读取快照文件
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let content =
        fs::read_to_string(path).with_context(|| format!("读取 {} 失败", path.display()))?;
    let snapshot = serde_json::from_str(&content)
        .with_context(|| format!("解析 {} 失败", path.display()))?;
    Ok(snapshot)
}

/// 读取名称映射，文件不存在或无法解析时返回空映射
pub fn load_names(path: &Path) -> HashMap<String, String> {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Recommendation};

    fn report(symbol: &str) -> InstrumentReport {
        InstrumentReport {
            symbol: symbol.to_string(),
            name: "台積電".to_string(),
            price: 612.0,
            change: 7.0,
            change_percent: 1.16,
            volume: 25_000_000,
            recommendation: Recommendation {
                action: Action::Hold,
                reason: "價格持穩，建議續抱觀察".to_string(),
                confidence: 0.5,
                signals: None,
            },
        }
    }

    #[test]
    fn test_taipei_time() {
        let time = taipei_now().to_rfc3339();
        println!("  当前台北时间: {}", time);
        assert!(time.contains("+08:00"));
    }

    #[test]
    fn test_write_and_load_snapshot() {
        println!("\n========== 测试写入快照 ==========");
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            data_path: dir.path().join("public").join("data.json"),
            history_dir: dir.path().join("history"),
            names_path: dir.path().join("public").join("names.json"),
            write_names: true,
        };

        let snapshot = build_snapshot(vec![report("2330.TW")]);
        let written = write_snapshot(&snapshot, &output).unwrap();
        for path in &written {
            println!("  {}", path.display());
            assert!(path.exists());
        }
        assert_eq!(written.len(), 2);
        assert!(written[1].starts_with(&output.history_dir));

        let content = fs::read_to_string(&output.data_path).unwrap();
        // 中文不转义
        assert!(content.contains("台積電"));
        assert!(content.contains("\"updatedAt\""));
        assert!(content.contains("\"changePercent\""));

        let loaded = load_snapshot(&written[1]).unwrap();
        assert_eq!(loaded.stocks, snapshot.stocks);
        assert_eq!(loaded.updated_at, snapshot.updated_at);
        println!("✅ 快照写入测试通过！");
    }

    #[test]
    fn test_write_names_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        let mut names = HashMap::new();
        names.insert("2330.TW".to_string(), "台積電".to_string());
        names.insert("0050.TW".to_string(), "元大台灣50".to_string());

        write_names(&names, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, r#"{"0050.TW":"元大台灣50","2330.TW":"台積電"}"#);
        assert_eq!(load_names(&path), names);
        assert!(load_names(&dir.path().join("missing.json")).is_empty());
    }

    #[test]
    fn test_load_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(&dir.path().join("missing.json")).is_err());
    }
}
