use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, NaiveDateTime};
use std::sync::Arc;

use crate::error::{ProcessingError, Result};
use crate::models::{ArchiveRecord, LocalObservation, Pollutant, SiteType};
use crate::utils::datetime::{date_to_days, days_to_date};

/// A row type with a fixed Arrow layout, used by the Parquet store.
pub trait ParquetRow: Sized {
    fn arrow_schema() -> SchemaRef;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a A> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<A>())
        .ok_or_else(|| {
            ProcessingError::Schema(format!("column '{}' missing or of unexpected type", name))
        })
}

fn opt_f64(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn strings<T>(rows: &[T], f: impl Fn(&T) -> &str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(rows.iter().map(f)))
}

fn floats<T>(rows: &[T], f: impl Fn(&T) -> Option<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn to_micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

fn from_micros(micros: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| ProcessingError::Schema(format!("timestamp {} out of range", micros)))
}

impl ParquetRow for LocalObservation {
    fn arrow_schema() -> SchemaRef {
        let mut fields = vec![
            Field::new("site", DataType::Utf8, false),
            Field::new("location", DataType::Utf8, false),
            Field::new("site_type", DataType::Utf8, false),
        ];
        for pollutant in Pollutant::ALL {
            fields.push(Field::new(pollutant.column_name(), DataType::Float64, true));
        }
        fields.push(Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ));

        Arc::new(Schema::new(fields))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns: Vec<ArrayRef> = vec![
            strings(rows, |r| r.site.as_str()),
            strings(rows, |r| r.location.as_str()),
            strings(rows, |r| r.site_type.label()),
        ];
        for pollutant in Pollutant::ALL {
            columns.push(floats(rows, |r| r.pollutant(pollutant)));
        }
        columns.push(Arc::new(TimestampMicrosecondArray::from(
            rows.iter().map(|r| to_micros(r.timestamp)).collect::<Vec<_>>(),
        )));

        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let sites = column::<StringArray>(batch, "site")?;
        let locations = column::<StringArray>(batch, "location")?;
        let site_types = column::<StringArray>(batch, "site_type")?;
        let timestamps = column::<TimestampMicrosecondArray>(batch, "timestamp")?;
        let pollutants = Pollutant::ALL
            .iter()
            .map(|p| column::<Float64Array>(batch, p.column_name()).map(|values| (*p, values)))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let mut observation = LocalObservation {
                site: sites.value(i).to_string(),
                location: locations.value(i).to_string(),
                site_type: SiteType::from_label(site_types.value(i)),
                o3: None,
                o3_max: None,
                no2: None,
                nox: None,
                so2: None,
                pm10: None,
                pm2_5: None,
                co: None,
                timestamp: from_micros(timestamps.value(i))?,
            };
            for (pollutant, values) in &pollutants {
                observation.set_pollutant(*pollutant, opt_f64(values, i));
            }
            rows.push(observation);
        }
        Ok(rows)
    }
}

impl ParquetRow for ArchiveRecord {
    fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("who_region", DataType::Utf8, false),
            Field::new("iso3", DataType::Utf8, false),
            Field::new("country_name", DataType::Utf8, false),
            Field::new("city", DataType::Utf8, false),
            Field::new("year", DataType::Date32, false),
            Field::new("version", DataType::Utf8, false),
            Field::new("pm10_concentration", DataType::Float64, true),
            Field::new("pm25_concentration", DataType::Float64, true),
            Field::new("no2_concentration", DataType::Float64, true),
            Field::new("pm10_tempcov", DataType::Float64, true),
            Field::new("pm25_tempcov", DataType::Float64, true),
            Field::new("no2_tempcov", DataType::Float64, true),
            Field::new("type_of_stations", DataType::Utf8, false),
            Field::new("population", DataType::Float64, true),
            Field::new("latitude", DataType::Float64, true),
            Field::new("longitude", DataType::Float64, true),
            Field::new("who_ms", DataType::Boolean, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let years: Vec<i32> = rows.iter().map(|r| date_to_days(r.year())).collect();
        let who_ms: Vec<bool> = rows.iter().map(|r| r.who_ms).collect();

        let columns: Vec<ArrayRef> = vec![
            strings(rows, |r| r.who_region.as_str()),
            strings(rows, |r| r.iso3.as_str()),
            strings(rows, |r| r.country_name.as_str()),
            strings(rows, |r| r.city.as_str()),
            Arc::new(Date32Array::from(years)),
            strings(rows, |r| r.version.as_str()),
            floats(rows, |r| r.pm10_concentration),
            floats(rows, |r| r.pm25_concentration),
            floats(rows, |r| r.no2_concentration),
            floats(rows, |r| r.pm10_tempcov),
            floats(rows, |r| r.pm25_tempcov),
            floats(rows, |r| r.no2_tempcov),
            strings(rows, |r| r.type_of_stations.as_str()),
            floats(rows, |r| r.population),
            floats(rows, |r| r.latitude),
            floats(rows, |r| r.longitude),
            Arc::new(BooleanArray::from(who_ms)),
        ];

        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let who_region = column::<StringArray>(batch, "who_region")?;
        let iso3 = column::<StringArray>(batch, "iso3")?;
        let country_name = column::<StringArray>(batch, "country_name")?;
        let city = column::<StringArray>(batch, "city")?;
        let year = column::<Date32Array>(batch, "year")?;
        let version = column::<StringArray>(batch, "version")?;
        let pm10 = column::<Float64Array>(batch, "pm10_concentration")?;
        let pm25 = column::<Float64Array>(batch, "pm25_concentration")?;
        let no2 = column::<Float64Array>(batch, "no2_concentration")?;
        let pm10_cov = column::<Float64Array>(batch, "pm10_tempcov")?;
        let pm25_cov = column::<Float64Array>(batch, "pm25_tempcov")?;
        let no2_cov = column::<Float64Array>(batch, "no2_tempcov")?;
        let stations = column::<StringArray>(batch, "type_of_stations")?;
        let population = column::<Float64Array>(batch, "population")?;
        let latitude = column::<Float64Array>(batch, "latitude")?;
        let longitude = column::<Float64Array>(batch, "longitude")?;
        let who_ms = column::<BooleanArray>(batch, "who_ms")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let date = days_to_date(year.value(i)).ok_or_else(|| {
                ProcessingError::Schema(format!("year value {} out of range", year.value(i)))
            })?;
            let mut record = ArchiveRecord::new(
                country_name.value(i).to_string(),
                city.value(i).to_string(),
                f64::from(date.year()),
            )
            .ok_or_else(|| ProcessingError::Schema(format!("stored year {} is invalid", date)))?;

            record.who_region = who_region.value(i).to_string();
            record.iso3 = iso3.value(i).to_string();
            record.version = version.value(i).to_string();
            record.pm10_concentration = opt_f64(pm10, i);
            record.pm25_concentration = opt_f64(pm25, i);
            record.no2_concentration = opt_f64(no2, i);
            record.pm10_tempcov = opt_f64(pm10_cov, i);
            record.pm25_tempcov = opt_f64(pm25_cov, i);
            record.no2_tempcov = opt_f64(no2_cov, i);
            record.type_of_stations = stations.value(i).to_string();
            record.population = opt_f64(population, i);
            record.latitude = opt_f64(latitude, i);
            record.longitude = opt_f64(longitude, i);
            record.who_ms = who_ms.value(i);
            rows.push(record);
        }
        Ok(rows)
    }
}
