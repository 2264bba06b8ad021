use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::ipc::reader::StreamReader;
use std::io::Cursor;

use crate::config::ColumnMapping;
use crate::dataset::{ColumnIndex, Dataset, RawRecord};
use crate::utils::AnalysisError;

/// Parse an Arrow IPC Stream results table into a normalized dataset
///
/// # Arguments
/// * `name` - Dataset name
/// * `data` - Raw bytes in Arrow IPC Stream format
/// * `mapping` - Column names for the semantic fields
///
/// # Returns
/// * `Ok(Dataset)` - Normalized table; columns of any type are read as text
///   and coerced the same way CSV cells are
/// * `Err(AnalysisError)` - If the stream is unreadable or a mapped column
///   is missing
pub fn parse_arrow_ipc(
    name: String,
    data: &[u8],
    mapping: &ColumnMapping,
) -> Result<Dataset, AnalysisError> {
    if data.is_empty() {
        return Err(AnalysisError::ArrowError("empty input data".to_string()));
    }

    let reader = StreamReader::try_new(Cursor::new(data), None)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create StreamReader: {}", e)))?;

    let schema = reader.schema();
    let headers: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let columns = ColumnIndex::resolve(&headers, mapping)?;

    let mut raw: Vec<RawRecord> = Vec::new();
    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| AnalysisError::ArrowError(format!("failed to read batch: {}", e)))?;

        let text = batch
            .columns()
            .iter()
            .map(as_text)
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            raw.push(columns.extract(|i| {
                text.get(i)
                    .filter(|col| !col.is_null(row))
                    .map(|col| col.value(row))
            }));
        }
    }

    log::info!("Arrow IPC '{}': {} rows, {} columns", name, raw.len(), headers.len());
    Ok(Dataset::from_raw(name, raw))
}

/// Read any column as text
fn as_text(column: &ArrayRef) -> Result<StringArray, AnalysisError> {
    let converted = cast(column, &DataType::Utf8).map_err(|e| {
        AnalysisError::ArrowError(format!(
            "cannot read {} column as text: {}",
            column.data_type(),
            e
        ))
    })?;
    converted
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| AnalysisError::ArrowError("cast did not produce Utf8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Stratum;
    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::{Field, Schema};
    use arrow::ipc::writer::StreamWriter;
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn write_table(columns: Vec<(&str, ArrayRef)>) -> Vec<u8> {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));
        let batch =
            RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect())
                .unwrap();

        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, &schema).unwrap();
            writer.write(&batch).unwrap();
            writer.finish().unwrap();
        }
        buffer
    }

    fn strings(values: Vec<Option<&str>>) -> ArrayRef {
        Arc::new(StringArray::from(values))
    }

    #[test]
    fn test_parse_arrow_ipc() {
        let bytes = write_table(vec![
            ("periodo", Arc::new(Int64Array::from(vec![20194, 20194, 20194])) as ArrayRef),
            (
                "punt_global",
                Arc::new(Float64Array::from(vec![Some(287.0), None, Some(301.0)])) as ArrayRef,
            ),
            (
                "fami_estratovivienda",
                strings(vec![Some("Estrato 1"), Some("Estrato 9"), Some("Estrato 6")]),
            ),
            ("fami_educacionmadre", strings(vec![Some("Ninguno"), None, Some("Postgrado")])),
            ("fami_educacionpadre", strings(vec![None, None, Some("Postgrado")])),
            (
                "cole_mcpio_ubicacion",
                strings(vec![Some("Villamaría"), Some("Neira"), Some(" manizales")]),
            ),
        ]);

        let dataset =
            parse_arrow_ipc("caldas".to_string(), &bytes, &ColumnMapping::default()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.records[0].score_global, Some(287.0));
        assert_eq!(dataset.records[0].municipality.as_deref(), Some("VILLAMARIA"));
        assert_eq!(dataset.records[1].score_global, None);
        assert_eq!(dataset.records[1].stratum, None);
        assert_eq!(dataset.records[2].stratum, Some(Stratum::E6));
        assert_eq!(dataset.records[2].municipality.as_deref(), Some("MANIZALES"));
        assert_eq!(dataset.quality.unrecognized_strata.get("Estrato 9"), Some(&1));
    }

    #[test]
    fn test_parse_arrow_ipc_missing_column() {
        let bytes = write_table(vec![(
            "punt_global",
            Arc::new(Float64Array::from(vec![250.0])) as ArrayRef,
        )]);
        let err = parse_arrow_ipc("bad".to_string(), &bytes, &ColumnMapping::default())
            .unwrap_err();
        assert!(err.to_string().contains("missing required columns"));
    }

    #[test]
    fn test_parse_arrow_ipc_empty_input() {
        let err = parse_arrow_ipc("empty".to_string(), &[], &ColumnMapping::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "ArrowError: empty input data");
    }

    #[test]
    fn test_parse_arrow_ipc_garbage() {
        let result = parse_arrow_ipc("bad".to_string(), &[1, 2, 3, 4], &ColumnMapping::default());
        assert!(matches!(result, Err(AnalysisError::ArrowError(_))));
    }
}
