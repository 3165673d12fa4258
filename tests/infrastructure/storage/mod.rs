mod working_storage_test;
