//! 声明 entities 模块下的所有实体
//!
//! 层级：pia_board / pmt_device → test_log → sub_test → spec；
//! manufacturer → manufacturer_device_batch → manufacturer_spec

pub mod pia_board;
pub mod pmt_device;
pub mod test_log;
pub mod spec;
pub mod manufacturer;
pub mod manufacturer_device_batch;
pub mod manufacturer_spec;

/// 常用实体别名
pub mod prelude {
    pub use super::manufacturer::Entity as Manufacturer;
    pub use super::manufacturer_device_batch::Entity as ManufacturerDeviceBatch;
    pub use super::manufacturer_spec::Entity as ManufacturerSpec;
    pub use super::pia_board::Entity as PiaBoard;
    pub use super::pmt_device::Entity as PmtDevice;
    pub use super::spec::Entity as Spec;
    pub use super::sub_test::Entity as SubTest;
    pub use super::test_log::Entity as TestLog;
}
