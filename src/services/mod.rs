//! 业务逻辑服务模块
//!
//! 封装数据获取、指标分析与快照持久化

pub mod processor;      // 单只股票处理流程
pub mod recommendation; // 投资建议引擎
pub mod snapshot;       // 快照持久化
pub mod twse;           // 台股 ISIN 清单
pub mod updater;        // 每日批次更新
pub mod yahoo;          // Yahoo Finance 日线接口
