pub mod convert;
pub mod reader;
pub mod record;

pub use convert::{
    convert_field, convert_record, CellValue, Conversion, ConversionPolicy, ConversionStats,
};
pub use reader::SourceReader;
pub use record::SourceRecord;
