mod service_records;
