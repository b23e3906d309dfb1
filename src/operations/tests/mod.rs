mod payment_tests;
