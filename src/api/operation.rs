// ==========================================
// 智能传送带分拣系统 - 调用操作枚举
// ==========================================
// 职责: 外部函数名 → 显式操作种类（不做按名反射调用）
// 说明: 同时接受旧版函数名（storeConveyorItem 等）作为别名
// ==========================================

use std::fmt;
use std::str::FromStr;

/// 调用边界暴露的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConveyorOperation {
    Init,
    StoreItem,
    EditBay,
    MoveItemIntoBay,
    MoveItemOutOfBay,
    GetBays,
    GetItemsByBay,
    GetItemById,
    GetItemsByDescription,
    ControlBays,
    ReportBayActivity,
}

impl ConveyorOperation {
    pub const ALL: [ConveyorOperation; 11] = [
        ConveyorOperation::Init,
        ConveyorOperation::StoreItem,
        ConveyorOperation::EditBay,
        ConveyorOperation::MoveItemIntoBay,
        ConveyorOperation::MoveItemOutOfBay,
        ConveyorOperation::GetBays,
        ConveyorOperation::GetItemsByBay,
        ConveyorOperation::GetItemById,
        ConveyorOperation::GetItemsByDescription,
        ConveyorOperation::ControlBays,
        ConveyorOperation::ReportBayActivity,
    ];

    /// 规范函数名
    pub fn as_str(&self) -> &'static str {
        match self {
            ConveyorOperation::Init => "init",
            ConveyorOperation::StoreItem => "storeItem",
            ConveyorOperation::EditBay => "editBay",
            ConveyorOperation::MoveItemIntoBay => "moveItemIntoBay",
            ConveyorOperation::MoveItemOutOfBay => "moveItemOutOfBay",
            ConveyorOperation::GetBays => "getBays",
            ConveyorOperation::GetItemsByBay => "getItemsByBay",
            ConveyorOperation::GetItemById => "getItemById",
            ConveyorOperation::GetItemsByDescription => "getItemsByDescription",
            ConveyorOperation::ControlBays => "controlBays",
            ConveyorOperation::ReportBayActivity => "reportBayActivity",
        }
    }

    /// 期望的参数个数
    pub fn arity(&self) -> usize {
        match self {
            ConveyorOperation::Init | ConveyorOperation::GetBays | ConveyorOperation::ControlBays => 0,
            _ => 1,
        }
    }

    /// 是否产生写入
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ConveyorOperation::Init
                | ConveyorOperation::StoreItem
                | ConveyorOperation::EditBay
                | ConveyorOperation::MoveItemIntoBay
                | ConveyorOperation::MoveItemOutOfBay
                | ConveyorOperation::ControlBays
                | ConveyorOperation::ReportBayActivity
        )
    }

    /// 是否先执行巡检
    pub fn runs_sweep_first(&self) -> bool {
        matches!(
            self,
            ConveyorOperation::StoreItem
                | ConveyorOperation::MoveItemIntoBay
                | ConveyorOperation::MoveItemOutOfBay
        )
    }
}

impl fmt::Display for ConveyorOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConveyorOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "init" => Ok(ConveyorOperation::Init),
            "storeItem" | "storeConveyorItem" => Ok(ConveyorOperation::StoreItem),
            "editBay" | "editConveyorBay" => Ok(ConveyorOperation::EditBay),
            "moveItemIntoBay" | "conveyorItemIntoConveyorBay" => Ok(ConveyorOperation::MoveItemIntoBay),
            "moveItemOutOfBay" | "conveyorItemOutConveyorBay" => Ok(ConveyorOperation::MoveItemOutOfBay),
            "getBays" => Ok(ConveyorOperation::GetBays),
            "getItemsByBay" => Ok(ConveyorOperation::GetItemsByBay),
            "getItemById" => Ok(ConveyorOperation::GetItemById),
            "getItemsByDescription" => Ok(ConveyorOperation::GetItemsByDescription),
            "controlBays" => Ok(ConveyorOperation::ControlBays),
            "reportBayActivity" => Ok(ConveyorOperation::ReportBayActivity),
            other => Err(format!("unknown function: {}", other)),
        }
    }
}
