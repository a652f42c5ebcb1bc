use sqlx::MySqlPool;
use tracing::info;

pub async fn init_db(database_url: &str) -> MySqlPool {
    MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

/// Idempotent schema bootstrap, run once at startup before the scheduler and
/// the HTTP server. Note the attendance table deliberately carries NO unique
/// key on (employee_id, att_date): multiple punches per employee per day are
/// a feature (multi-shift / OT punching).
pub async fn ensure_schema(pool: &MySqlPool) {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            name VARCHAR(191) NOT NULL,
            address VARCHAR(255) NULL,
            contact_email VARCHAR(191) NULL,
            status VARCHAR(32) NOT NULL DEFAULT 'active',
            created_at TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            employee_code VARCHAR(64) NOT NULL UNIQUE,
            first_name VARCHAR(100) NOT NULL,
            last_name VARCHAR(100) NOT NULL,
            email VARCHAR(191) NOT NULL,
            phone VARCHAR(32) NULL,
            organization_id BIGINT UNSIGNED NOT NULL,
            category VARCHAR(100) NOT NULL,
            hire_date DATE NOT NULL,
            status VARCHAR(32) NOT NULL DEFAULT 'active',
            CONSTRAINT fk_employee_org FOREIGN KEY (organization_id)
                REFERENCES organizations(id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS shifts (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            name VARCHAR(100) NOT NULL,
            category VARCHAR(100) NOT NULL,
            start_time VARCHAR(20) NOT NULL,
            end_time VARCHAR(20) NOT NULL,
            grace_before_min BIGINT NULL,
            grace_after_min BIGINT NULL,
            presence_time_sec BIGINT NULL,
            presence_count BIGINT NULL,
            presence_window_sec BIGINT NULL,
            created_at TIMESTAMP NULL DEFAULT CURRENT_TIMESTAMP,
            INDEX idx_shift_category (category)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            employee_id BIGINT UNSIGNED NOT NULL,
            att_date DATE NOT NULL,
            check_in DATETIME NULL,
            check_out DATETIME NULL,
            delay_minutes BIGINT NOT NULL DEFAULT 0,
            extra_minutes BIGINT NOT NULL DEFAULT 0,
            total_hours DOUBLE NOT NULL DEFAULT 0,
            ot_hours DOUBLE NOT NULL DEFAULT 0,
            ot_manual BOOLEAN NOT NULL DEFAULT FALSE,
            check_in_location VARCHAR(255) NULL,
            check_out_location VARCHAR(255) NULL,
            is_edited BOOLEAN NOT NULL DEFAULT FALSE,
            remark VARCHAR(255) NULL,
            edited_at DATETIME NULL,
            INDEX idx_att_employee_date (employee_id, att_date),
            INDEX idx_att_open (check_out),
            CONSTRAINT fk_att_employee FOREIGN KEY (employee_id)
                REFERENCES employees(id) ON DELETE CASCADE
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS presence_detections (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            employee_id BIGINT UNSIGNED NOT NULL,
            detected_at DATETIME NOT NULL,
            det_date DATE NOT NULL,
            INDEX idx_det_employee_date (employee_id, det_date),
            CONSTRAINT fk_det_employee FOREIGN KEY (employee_id)
                REFERENCES employees(id) ON DELETE CASCADE
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            username VARCHAR(100) NOT NULL UNIQUE,
            password VARCHAR(255) NOT NULL,
            role_id TINYINT UNSIGNED NOT NULL DEFAULT 3,
            employee_id BIGINT UNSIGNED NULL,
            last_login_at TIMESTAMP NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,
            user_id BIGINT UNSIGNED NOT NULL,
            jti VARCHAR(64) NOT NULL,
            expires_at TIMESTAMP NOT NULL,
            revoked BOOLEAN NOT NULL DEFAULT FALSE,
            INDEX idx_refresh_jti (jti)
        )
        "#,
    ];

    for sql in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .expect("Schema bootstrap failed");
    }

    info!("Schema bootstrap complete");
}
