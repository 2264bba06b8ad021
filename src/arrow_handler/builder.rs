use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::Arc;

use crate::aggregate::{Distribution, PivotTable};
use crate::gap::GapRanking;
use crate::utils::AnalysisError;

/// Build Arrow IPC result for the gap ranking
///
/// # Arguments
/// * `ranking` - Ordered gap rows; row order is preserved in the batch
///
/// # Returns
/// * `Ok(Vec<u8>)` - Arrow IPC Stream format bytes; schema metadata carries
///   `min_n` and `selection_size`
/// * `Err(AnalysisError)` - If building fails
pub fn build_gap_ranking_result(ranking: &GapRanking) -> Result<Vec<u8>, AnalysisError> {
    let metadata = HashMap::from([
        ("min_n".to_string(), ranking.min_n.to_string()),
        ("selection_size".to_string(), ranking.selection_size.to_string()),
    ]);

    // Define schema (order fixed: municipality, low, mid, high, gap)
    let schema = Arc::new(
        Schema::new(vec![
            Field::new("municipality", DataType::Utf8, false),
            Field::new("mean_low", DataType::Float64, false),
            Field::new("count_low", DataType::UInt64, false),
            Field::new("mean_mid", DataType::Float64, true),
            Field::new("count_mid", DataType::UInt64, true),
            Field::new("mean_high", DataType::Float64, false),
            Field::new("count_high", DataType::UInt64, false),
            Field::new("gap", DataType::Float64, false),
        ])
        .with_metadata(metadata),
    );

    let rows = &ranking.rows;
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.municipality.as_str()),
        )),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.mean_low))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.count_low as u64))),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.mean_mid).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            rows.iter()
                .map(|r| r.count_mid.map(|c| c as u64))
                .collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.mean_high))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.count_high as u64))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.gap))),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create RecordBatch: {}", e)))?;

    serialize_to_ipc(schema, batch)
}

/// Build Arrow IPC result for the stratum × education pivot
///
/// One `stratum` label column followed by one nullable Float64 column per
/// education value, in pivot order.
pub fn build_pivot_result(pivot: &PivotTable) -> Result<Vec<u8>, AnalysisError> {
    if pivot.means.dim() != (pivot.strata.len(), pivot.columns.len()) {
        return Err(AnalysisError::ValidationError(
            "pivot labels and cells must have matching shape".to_string(),
        ));
    }

    let mut fields = vec![Field::new("stratum", DataType::Utf8, false)];
    fields.extend(
        pivot
            .columns
            .iter()
            .map(|name| Field::new(name.as_str(), DataType::Float64, true)),
    );
    let metadata = HashMap::from([("education".to_string(), pivot.education.to_string())]);
    let schema = Arc::new(Schema::new(fields).with_metadata(metadata));

    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(
        pivot.strata.iter().map(|s| s.label()),
    ))];
    for column in pivot.means.columns() {
        columns.push(Arc::new(Float64Array::from(column.to_vec())));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create RecordBatch: {}", e)))?;

    serialize_to_ipc(schema, batch)
}

/// Build Arrow IPC result for the per-stratum distribution
pub fn build_distribution_result(distribution: &Distribution) -> Result<Vec<u8>, AnalysisError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("stratum", DataType::Utf8, false),
        Field::new("rows", DataType::UInt64, false),
        Field::new("scored", DataType::UInt64, false),
        Field::new("mean", DataType::Float64, true),
        Field::new("min", DataType::Float64, true),
        Field::new("q1", DataType::Float64, true),
        Field::new("median", DataType::Float64, true),
        Field::new("q3", DataType::Float64, true),
        Field::new("max", DataType::Float64, true),
    ]));

    let groups = &distribution.groups;
    let stat_column = |pick: fn(&crate::stats::Statistics) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(
            groups
                .iter()
                .map(|g| g.stats.as_ref().map(pick))
                .collect::<Vec<_>>(),
        ))
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            groups.iter().map(|g| g.stratum.label()),
        )),
        Arc::new(UInt64Array::from_iter_values(groups.iter().map(|g| g.rows as u64))),
        Arc::new(UInt64Array::from_iter_values(
            groups
                .iter()
                .map(|g| g.stats.as_ref().map_or(0, |s| s.count as u64)),
        )),
        stat_column(|s| s.mean),
        stat_column(|s| s.min),
        stat_column(|s| s.q1),
        stat_column(|s| s.median),
        stat_column(|s| s.q3),
        stat_column(|s| s.max),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create RecordBatch: {}", e)))?;

    serialize_to_ipc(schema, batch)
}

/// Serialize RecordBatch to Arrow IPC Stream format
fn serialize_to_ipc(schema: Arc<Schema>, batch: RecordBatch) -> Result<Vec<u8>, AnalysisError> {
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, &schema).map_err(|e| {
            AnalysisError::ArrowError(format!("failed to create StreamWriter: {}", e))
        })?;
        writer
            .write(&batch)
            .map_err(|e| AnalysisError::ArrowError(format!("failed to write batch: {}", e)))?;
        writer
            .finish()
            .map_err(|e| AnalysisError::ArrowError(format!("failed to finish writer: {}", e)))?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::StratumGroup;
    use crate::gap::GapRow;
    use crate::normalize::{EducationVariable, Stratum};
    use crate::stats::Statistics;
    use arrow::array::Array;
    use arrow::ipc::reader::StreamReader;
    use ndarray::arr2;
    use std::io::Cursor;

    fn read_back(bytes: Vec<u8>) -> RecordBatch {
        let reader = StreamReader::try_new(Cursor::new(bytes), None).unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 1);
        batches.into_iter().next().unwrap()
    }

    fn gap_row(name: &str, gap: f64, mid: Option<f64>) -> GapRow {
        GapRow {
            municipality: name.to_string(),
            mean_low: 200.0,
            count_low: 25,
            mean_mid: mid,
            count_mid: mid.map(|_| 12),
            mean_high: 200.0 + gap,
            count_high: 30,
            gap,
        }
    }

    #[test]
    fn test_build_gap_ranking_result() {
        let ranking = GapRanking {
            min_n: 20,
            selection_size: 27,
            excluded: vec!["MARULANDA".to_string()],
            rows: vec![gap_row("NEIRA", 12.5, None), gap_row("MANIZALES", 48.0, Some(230.0))],
        };

        let batch = read_back(build_gap_ranking_result(&ranking).unwrap());
        let schema = batch.schema();
        assert_eq!(schema.fields().len(), 8);
        assert_eq!(schema.fields()[0].name(), "municipality");
        assert_eq!(schema.fields()[7].name(), "gap");
        assert_eq!(schema.metadata().get("min_n").map(String::as_str), Some("20"));
        assert_eq!(batch.num_rows(), 2);

        let names = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(0), "NEIRA");
        let mid = batch.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(mid.is_null(0));
        assert_eq!(mid.value(1), 230.0);
        let gap = batch.column(7).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(gap.value(1), 48.0);
    }

    #[test]
    fn test_build_pivot_result() {
        let pivot = PivotTable {
            education: EducationVariable::Father,
            strata: vec![Stratum::E1, Stratum::E6],
            columns: vec!["Ninguno".to_string(), "Postgrado".to_string()],
            means: arr2(&[[Some(210.0), None], [Some(250.0), Some(330.0)]]),
            counts: arr2(&[[4, 0], [2, 9]]),
        };

        let batch = read_back(build_pivot_result(&pivot).unwrap());
        let schema = batch.schema();
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.fields()[2].name(), "Postgrado");
        assert_eq!(schema.metadata().get("education").map(String::as_str), Some("father"));

        let strata = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(strata.value(1), "Estrato 6");
        let postgrado = batch.column(2).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(postgrado.is_null(0));
        assert_eq!(postgrado.value(1), 330.0);
    }

    #[test]
    fn test_build_pivot_result_shape_mismatch() {
        let pivot = PivotTable {
            education: EducationVariable::Mother,
            strata: vec![Stratum::E1],
            columns: vec!["Ninguno".to_string(), "Postgrado".to_string()],
            means: arr2(&[[Some(1.0)]]),
            counts: arr2(&[[1]]),
        };
        let result = build_pivot_result(&pivot);
        assert!(result.unwrap_err().to_string().contains("matching shape"));
    }

    #[test]
    fn test_build_distribution_result() {
        let distribution = Distribution {
            groups: vec![
                StratumGroup {
                    stratum: Stratum::E2,
                    rows: 3,
                    stats: Statistics::compute([Some(1.0), Some(2.0), Some(3.0)]),
                },
                StratumGroup {
                    stratum: Stratum::E4,
                    rows: 2,
                    stats: None,
                },
            ],
        };

        let batch = read_back(build_distribution_result(&distribution).unwrap());
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().fields()[6].name(), "median");

        let scored = batch.column(2).as_any().downcast_ref::<UInt64Array>().unwrap();
        assert_eq!(scored.value(0), 3);
        assert_eq!(scored.value(1), 0);
        let median = batch.column(6).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(median.value(0), 2.0);
        assert!(median.is_null(1));
    }
}
