mod appointment_tests;
mod auth_tests;
mod business_tests;
mod city_tests;
mod health_tests;
mod payment_tests;
